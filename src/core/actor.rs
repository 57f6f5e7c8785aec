//! # WorkerActor: single-worker restart loop.
//!
//! Supervises one [`WorkerSpec`]:
//! - restarts per [`RestartPolicy`](crate::RestartPolicy),
//! - delays failures per [`BackoffPolicy`](crate::BackoffPolicy),
//! - escalates errors the [`FatalPolicy`] marks fatal,
//! - stops cooperatively via [`CancellationToken`].
//!
//! ## Loop
//! ```text
//! loop {
//!   ├─► acquire semaphore (optional, cancellable)
//!   ├─► publish WorkerStarting
//!   ├─► run_once() ─► factory() + worker.run(child)
//!   │     ├─ Ok / Canceled ─► reset failures
//!   │     │      ├─ cancelled              → exit(Cancelled)
//!   │     │      ├─ policy forbids restart → ActorExhausted, exit(Exhausted)
//!   │     │      └─ Always { interval }    → sleep(interval), continue
//!   │     └─ Err(e)
//!   │            ├─ is_fatal(e)            → ActorDead, report, exit(Fatal)
//!   │            ├─ cancelled              → exit(Cancelled)
//!   │            ├─ policy forbids restart → ActorExhausted, exit(Exhausted)
//!   │            └─ BackoffScheduled, sleep(backoff.next(failures)), continue
//! }
//! ```
//!
//! ## Rules
//! - Attempts run sequentially; the attempt counter never resets.
//! - Cancellation is observed at safe points: before each attempt, while waiting
//!   for a permit, and during every sleep.
//! - Errors are classified even while stopping, so a worker that notices a dead
//!   connection on its way out still takes the supervisor down.

use std::sync::Arc;
use std::time::Duration;

use tokio::{
    select,
    sync::{OwnedSemaphorePermit, Semaphore, mpsc},
    time,
};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{attempt::run_once, fatal::FatalPolicy},
    error::WorkerError,
    events::{Bus, Event, EventKind},
    workers::WorkerSpec,
};

/// A fatal worker error on its way to the supervisor.
#[derive(Debug)]
pub struct FatalReport {
    pub id: String,
    pub error: WorkerError,
}

/// Why an actor loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorExitReason {
    /// The worker was stopped or the supervisor shut down.
    Cancelled,
    /// The restart policy forbids another run.
    Exhausted,
    /// The worker failed with a fatal error.
    Fatal,
}

/// Supervises execution of one worker with retries, backoff and event publishing.
pub struct WorkerActor {
    spec: WorkerSpec,
    bus: Bus,
    policy: Arc<dyn FatalPolicy>,
    semaphore: Option<Arc<Semaphore>>,
    fatal_tx: mpsc::UnboundedSender<FatalReport>,
}

impl WorkerActor {
    pub fn new(
        spec: WorkerSpec,
        bus: Bus,
        policy: Arc<dyn FatalPolicy>,
        semaphore: Option<Arc<Semaphore>>,
        fatal_tx: mpsc::UnboundedSender<FatalReport>,
    ) -> Self {
        Self {
            spec,
            bus,
            policy,
            semaphore,
            fatal_tx,
        }
    }

    /// Runs the actor until cancellation, restart exhaustion, or a fatal error.
    pub async fn run(self, token: CancellationToken) -> ActorExitReason {
        let restart = self.spec.restart();
        let mut attempt: u32 = 0;
        let mut failures: u32 = 0;

        loop {
            if token.is_cancelled() {
                return ActorExitReason::Cancelled;
            }
            let permit = match self.acquire(&token).await {
                Ok(permit) => permit,
                Err(()) => return ActorExitReason::Cancelled,
            };

            attempt = attempt.saturating_add(1);
            self.bus.publish(
                Event::new(EventKind::WorkerStarting)
                    .with_worker(self.spec.id())
                    .with_attempt(attempt),
            );
            let res = run_once(&self.spec, &token, attempt, &self.bus).await;
            drop(permit);

            match res {
                Ok(()) | Err(WorkerError::Canceled) => {
                    failures = 0;
                    if token.is_cancelled() {
                        return ActorExitReason::Cancelled;
                    }
                    if !restart.restarts_after_success() {
                        return self.exhausted(attempt);
                    }
                    if let Some(interval) = restart.success_interval() {
                        if !sleep_or_cancel(interval, &token).await {
                            return ActorExitReason::Cancelled;
                        }
                    }
                }
                Err(e) => {
                    if self.policy.is_fatal(&e).await {
                        self.bus.publish(
                            Event::new(EventKind::ActorDead)
                                .with_worker(self.spec.id())
                                .with_attempt(attempt)
                                .with_reason(e.to_string()),
                        );
                        let _ = self.fatal_tx.send(FatalReport {
                            id: self.spec.id().to_string(),
                            error: e,
                        });
                        return ActorExitReason::Fatal;
                    }
                    if token.is_cancelled() {
                        return ActorExitReason::Cancelled;
                    }
                    if !restart.restarts_after_failure() {
                        return self.exhausted(attempt);
                    }

                    let delay = self.spec.backoff().next(failures);
                    failures = failures.saturating_add(1);
                    self.bus.publish(
                        Event::new(EventKind::BackoffScheduled)
                            .with_worker(self.spec.id())
                            .with_attempt(attempt)
                            .with_delay(delay)
                            .with_reason(e.to_string()),
                    );
                    if !sleep_or_cancel(delay, &token).await {
                        return ActorExitReason::Cancelled;
                    }
                }
            }
        }
    }

    /// Waits for a global permit, if a limit is configured. `Err` on cancel or closed semaphore.
    async fn acquire(&self, token: &CancellationToken) -> Result<Option<OwnedSemaphorePermit>, ()> {
        let Some(sem) = &self.semaphore else {
            return Ok(None);
        };
        select! {
            res = sem.clone().acquire_owned() => res.map(Some).map_err(|_closed| ()),
            _ = token.cancelled() => Err(()),
        }
    }

    fn exhausted(&self, attempt: u32) -> ActorExitReason {
        self.bus.publish(
            Event::new(EventKind::ActorExhausted)
                .with_worker(self.spec.id())
                .with_attempt(attempt),
        );
        ActorExitReason::Exhausted
    }
}

/// Sleeps for `d`; returns false if cancelled first.
async fn sleep_or_cancel(d: Duration, token: &CancellationToken) -> bool {
    if d.is_zero() {
        return !token.is_cancelled();
    }
    select! {
        _ = time::sleep(d) => true,
        _ = token.cancelled() => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fatal::FatalOnly;
    use crate::{BackoffPolicy, RestartPolicy, WorkerFn};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn actor(
        spec: WorkerSpec,
        bus: &Bus,
    ) -> (WorkerActor, mpsc::UnboundedReceiver<FatalReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            WorkerActor::new(spec, bus.clone(), Arc::new(FatalOnly), None, tx),
            rx,
        )
    }

    fn failing_n_times(runs: Arc<AtomicU32>, n: u32) -> WorkerSpec {
        let factory = WorkerFn::factory(move |_stop: CancellationToken| {
            let runs = Arc::clone(&runs);
            async move {
                if runs.fetch_add(1, Ordering::SeqCst) < n {
                    Err(WorkerError::fail("flaky"))
                } else {
                    Ok(())
                }
            }
        });
        WorkerSpec::new("flaky", factory, RestartPolicy::OnFailure, BackoffPolicy::immediate())
    }

    #[tokio::test]
    async fn test_restarts_until_success() {
        let bus = Bus::new(64);
        let runs = Arc::new(AtomicU32::new(0));
        let (actor, _rx) = actor(failing_n_times(runs.clone(), 3), &bus);

        let reason = actor.run(CancellationToken::new()).await;
        assert_eq!(reason, ActorExitReason::Exhausted);
        assert_eq!(runs.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_never_policy_gives_up_after_failure() {
        let bus = Bus::new(64);
        let runs = Arc::new(AtomicU32::new(0));
        let spec = failing_n_times(runs.clone(), 10).with_restart(RestartPolicy::Never);
        let (actor, _rx) = actor(spec, &bus);

        assert_eq!(actor.run(CancellationToken::new()).await, ActorExitReason::Exhausted);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fatal_error_is_reported() {
        let bus = Bus::new(64);
        let factory = WorkerFn::factory(|_stop: CancellationToken| async {
            Err(WorkerError::fatal("bad credentials"))
        });
        let spec = WorkerSpec::new("prov", factory, RestartPolicy::OnFailure, BackoffPolicy::immediate());
        let (actor, mut rx) = actor(spec, &bus);

        assert_eq!(actor.run(CancellationToken::new()).await, ActorExitReason::Fatal);
        let report = rx.recv().await.expect("fatal report");
        assert_eq!(report.id, "prov");
        assert_eq!(report.error, WorkerError::fatal("bad credentials"));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_backoff() {
        let bus = Bus::new(64);
        let runs = Arc::new(AtomicU32::new(0));
        let spec = failing_n_times(runs.clone(), u32::MAX).with_backoff(BackoffPolicy {
            first: Duration::from_secs(3600),
            ..BackoffPolicy::default()
        });
        let (actor, _rx) = actor(spec, &bus);

        let token = CancellationToken::new();
        let handle = tokio::spawn(actor.run(token.clone()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let reason = time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("actor exits promptly")
            .expect("join");
        assert_eq!(reason, ActorExitReason::Cancelled);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
