//! # Supervisor: runs named workers, restarts them, escalates fatal errors.
//!
//! The [`Supervisor`] owns the event bus, the worker [`Registry`], and the
//! shutdown driver. It is the plain implementation of [`Runner`].
//!
//! ## Architecture
//! ```text
//! start_worker(id, factory) ──► Registry::spawn ──► WorkerActor (one task per worker)
//!                                                      │ publish(Event)
//!                                                      ▼
//!                         Bus ──► listener ──► AliveTracker + SubscriberSet
//!
//! WorkerActor ── fatal error ──► fatal channel ──┐
//! kill() ── runtime_token.cancel() ──────────────┤
//!                                                ▼
//!                                     driver (one task)
//!                                       ├─► publish ShutdownRequested
//!                                       ├─► runtime_token.cancel()
//!                                       ├─► Registry::cancel_all() within cfg.grace
//!                                       ├─► merge late fatal reports (FatalPolicy::more_important)
//!                                       ├─► publish AllStoppedWithin / GraceExceeded
//!                                       └─► store result, cancel `done`
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use fleetvisor::{Runner, Supervisor, SupervisorConfig, WorkerError, WorkerFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = Supervisor::builder(SupervisorConfig::default()).build();
//!
//!     sup.start_worker("ticker", WorkerFn::factory(|stop: CancellationToken| async move {
//!         while !stop.is_cancelled() {
//!             tokio::time::sleep(Duration::from_millis(10)).await;
//!         }
//!         Ok::<(), WorkerError>(())
//!     })).await?;
//!
//!     sup.stop_worker("ticker").await?;
//!     sup.kill();
//!     sup.wait().await?;
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::{
    actor::FatalReport, alive::AliveTracker, builder::SupervisorBuilder, config::SupervisorConfig,
    fatal::FatalPolicy, registry::Registry,
};
use crate::{
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    runner::Runner,
    subscribers::SubscriberSet,
    workers::{WorkerFactory, WorkerSpec},
};

/// Runs named workers with restart policies and fatal-error escalation.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    registry: Arc<Registry>,
    alive: Arc<AliveTracker>,
    runtime_token: CancellationToken,
    done: CancellationToken,
    result: Arc<OnceLock<Result<(), RuntimeError>>>,
}

impl Supervisor {
    /// Creates a builder with the given configuration.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    /// Wires the runtime and spawns the listener and shutdown driver.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn start(
        cfg: SupervisorConfig,
        bus: Bus,
        subs: SubscriberSet,
        policy: Arc<dyn FatalPolicy>,
    ) -> Arc<Self> {
        let runtime_token = CancellationToken::new();
        let done = CancellationToken::new();
        let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();

        let semaphore = cfg
            .concurrency_limit()
            .map(tokio::sync::Semaphore::new)
            .map(Arc::new);
        let registry = Registry::new(
            bus.clone(),
            runtime_token.clone(),
            semaphore,
            Arc::clone(&policy),
            fatal_tx,
        );

        let sup = Arc::new(Self {
            cfg,
            bus,
            registry,
            alive: Arc::new(AliveTracker::new()),
            runtime_token,
            done,
            result: Arc::new(OnceLock::new()),
        });
        sup.spawn_listener(subs);
        sup.spawn_driver(fatal_rx, policy);
        sup
    }

    /// Starts a worker with explicit restart/backoff policies.
    pub async fn start_spec(&self, spec: WorkerSpec) -> Result<(), RuntimeError> {
        if self.runtime_token.is_cancelled() {
            return Err(RuntimeError::Stopped);
        }
        self.registry.spawn(spec).await
    }

    /// Sorted ids of registered workers.
    pub async fn workers(&self) -> Vec<String> {
        self.registry.list().await
    }

    /// Sorted ids of workers currently inside an attempt (eventually consistent).
    pub async fn alive(&self) -> Vec<String> {
        self.alive.snapshot().await
    }

    /// True if `id` is currently inside an attempt (eventually consistent).
    pub async fn is_alive(&self, id: &str) -> bool {
        self.alive.is_alive(id).await
    }

    /// The supervisor's configuration.
    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Subscribes to the raw event stream.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// True once shutdown has completed.
    pub fn is_terminated(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Forwards bus events to the alive tracker and subscribers until shutdown completes.
    fn spawn_listener(&self, subs: SubscriberSet) {
        let mut rx = self.bus.subscribe();
        let alive = Arc::clone(&self.alive);
        let done = self.done.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    msg = rx.recv() => match msg {
                        Ok(ev) => {
                            alive.update(&ev).await;
                            subs.emit(&ev);
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "supervisor event listener lagged");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                    _ = done.cancelled() => break,
                }
            }
            subs.shutdown().await;
        });
    }

    /// Waits for a kill or the first fatal report, then shuts everything down.
    fn spawn_driver(
        &self,
        mut fatal_rx: mpsc::UnboundedReceiver<FatalReport>,
        policy: Arc<dyn FatalPolicy>,
    ) {
        let bus = self.bus.clone();
        let registry = Arc::clone(&self.registry);
        let alive = Arc::clone(&self.alive);
        let token = self.runtime_token.clone();
        let done = self.done.clone();
        let result = Arc::clone(&self.result);
        let grace = self.cfg.grace;

        tokio::spawn(async move {
            let mut fatal: Option<FatalReport> = tokio::select! {
                _ = token.cancelled() => None,
                report = fatal_rx.recv() => report,
            };

            let mut ev = Event::new(EventKind::ShutdownRequested);
            if let Some(report) = &fatal {
                ev = ev.with_worker(report.id.as_str()).with_reason(report.error.to_string());
            }
            bus.publish(ev);
            token.cancel();

            let stopped = tokio::time::timeout(grace, registry.cancel_all()).await;

            while let Ok(report) = fatal_rx.try_recv() {
                fatal = match fatal {
                    Some(current) if !policy.more_important(&report.error, &current.error) => {
                        Some(current)
                    }
                    _ => Some(report),
                };
            }

            let res = match (fatal, stopped) {
                (Some(report), stopped) => {
                    bus.publish(Event::new(if stopped.is_ok() {
                        EventKind::AllStoppedWithin
                    } else {
                        EventKind::GraceExceeded
                    }));
                    Err(RuntimeError::Fatal {
                        id: report.id,
                        source: report.error,
                    })
                }
                (None, Ok(())) => {
                    bus.publish(Event::new(EventKind::AllStoppedWithin));
                    Ok(())
                }
                (None, Err(_elapsed)) => {
                    bus.publish(Event::new(EventKind::GraceExceeded));
                    Err(RuntimeError::GraceExceeded {
                        grace,
                        stuck: alive.snapshot().await,
                    })
                }
            };

            let _ = result.set(res);
            done.cancel();
        });
    }
}

#[async_trait]
impl Runner for Supervisor {
    async fn start_worker(&self, id: &str, factory: WorkerFactory) -> Result<(), RuntimeError> {
        self.start_spec(WorkerSpec::with_defaults(id, factory, &self.cfg))
            .await
    }

    async fn stop_worker(&self, id: &str) -> Result<(), RuntimeError> {
        self.registry.remove(id).await;
        Ok(())
    }

    fn kill(&self) {
        self.runtime_token.cancel();
    }

    async fn wait(&self) -> Result<(), RuntimeError> {
        self.done.cancelled().await;
        self.result.get().cloned().unwrap_or(Err(RuntimeError::Stopped))
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.runtime_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fatal::FatalOnly;
    use crate::testing::{Journal, Step, eventually, ticking_worker};
    use crate::{BackoffPolicy, RestartPolicy, WorkerError, WorkerFn};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast_config() -> SupervisorConfig {
        SupervisorConfig {
            grace: Duration::from_secs(2),
            backoff: BackoffPolicy::immediate(),
            ..SupervisorConfig::default()
        }
    }

    fn supervisor() -> Arc<Supervisor> {
        Supervisor::builder(fast_config()).build()
    }

    #[tokio::test]
    async fn test_stop_worker_is_synchronous() {
        let sup = supervisor();
        let journal = Journal::new();
        sup.start_worker("w", ticking_worker(&journal, 1)).await.expect("start");
        journal.expect(1, Step::Start).await;

        sup.stop_worker("w").await.expect("stop");
        assert_eq!(journal.last(1), Some(Step::Stop), "worker must have exited before stop returns");
        assert!(sup.workers().await.is_empty());

        sup.kill();
        sup.wait().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let sup = supervisor();
        let journal = Journal::new();
        sup.start_worker("w", ticking_worker(&journal, 1)).await.expect("start");

        let err = sup
            .start_worker("w", ticking_worker(&journal, 1))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, RuntimeError::DuplicateId { ref id } if id == "w"));
        assert_eq!(sup.workers().await, vec!["w"]);

        sup.kill();
        sup.wait().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn test_stop_unknown_worker_succeeds() {
        let sup = supervisor();
        sup.stop_worker("nope").await.expect("no-op");
        sup.kill();
        sup.wait().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn test_non_fatal_failure_is_restarted() {
        let sup = supervisor();
        let runs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&runs);
        sup.start_worker(
            "flaky",
            WorkerFn::factory(move |stop: CancellationToken| {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        return Err(WorkerError::fail("transient"));
                    }
                    stop.cancelled().await;
                    Ok(())
                }
            }),
        )
        .await
        .expect("start");

        tokio::time::timeout(Duration::from_secs(2), async {
            while runs.load(Ordering::SeqCst) < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("restarted twice");
        assert_eq!(sup.workers().await, vec!["flaky"]);

        sup.kill();
        sup.wait().await.expect("clean shutdown");
    }

    #[tokio::test]
    async fn test_fatal_error_stops_everything() {
        let sup = supervisor();
        let journal = Journal::new();
        sup.start_worker("steady", ticking_worker(&journal, 1)).await.expect("start");
        journal.expect(1, Step::Start).await;
        let live = &sup;
        eventually(move || async move { live.is_alive("steady").await }).await;

        sup.start_worker(
            "doomed",
            WorkerFn::factory(|_stop: CancellationToken| async {
                Err(WorkerError::fatal("credentials revoked"))
            }),
        )
        .await
        .expect("start");

        let err = tokio::time::timeout(Duration::from_secs(2), sup.wait())
            .await
            .expect("supervisor terminates")
            .expect_err("fatal");
        match err {
            RuntimeError::Fatal { id, source } => {
                assert_eq!(id, "doomed");
                assert_eq!(source, WorkerError::fatal("credentials revoked"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(journal.last(1), Some(Step::Stop));
        assert!(matches!(
            sup.start_worker("late", ticking_worker(&journal, 2)).await,
            Err(RuntimeError::Stopped)
        ));
    }

    #[tokio::test]
    async fn test_more_important_error_is_reported() {
        struct PreferDisk;

        #[async_trait]
        impl FatalPolicy for PreferDisk {
            async fn is_fatal(&self, err: &WorkerError) -> bool {
                FatalOnly.is_fatal(err).await
            }

            fn more_important(&self, candidate: &WorkerError, _current: &WorkerError) -> bool {
                candidate.to_string().contains("disk")
            }
        }

        let sup = Supervisor::builder(fast_config())
            .with_fatal_policy(Arc::new(PreferDisk))
            .build();

        let ready = Arc::new(tokio::sync::Notify::new());
        let signal = Arc::clone(&ready);
        sup.start_spec(WorkerSpec::new(
            "second",
            WorkerFn::factory(move |stop: CancellationToken| {
                let signal = Arc::clone(&signal);
                async move {
                    signal.notify_one();
                    stop.cancelled().await;
                    Err(WorkerError::fatal("disk corrupted on shutdown"))
                }
            }),
            RestartPolicy::OnFailure,
            BackoffPolicy::immediate(),
        ))
        .await
        .expect("start");
        ready.notified().await;

        sup.start_worker(
            "first",
            WorkerFn::factory(|_stop: CancellationToken| async {
                Err(WorkerError::fatal("network"))
            }),
        )
        .await
        .expect("start");

        match sup.wait().await {
            Err(RuntimeError::Fatal { id, .. }) => assert_eq!(id, "second"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_grace_exceeded_reports_stuck_workers() {
        let sup = Supervisor::builder(SupervisorConfig {
            grace: Duration::from_millis(50),
            ..fast_config()
        })
        .build();

        sup.start_worker(
            "stubborn",
            WorkerFn::factory(|_stop: CancellationToken| async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }),
        )
        .await
        .expect("start");
        tokio::time::sleep(Duration::from_millis(20)).await;

        sup.kill();
        match sup.wait().await {
            Err(RuntimeError::GraceExceeded { stuck, .. }) => assert_eq!(stuck, vec!["stubborn"]),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
