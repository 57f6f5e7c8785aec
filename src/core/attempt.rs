//! # Run a single attempt of a worker.
//!
//! Builds a worker from the [`WorkerSpec`] factory, runs it with a child cancellation
//! token, and publishes the terminal lifecycle event.
//!
//! ```text
//! factory() → Ok(worker) → worker.run(child) → Ok / Canceled → WorkerStopped
//!                                            → Err(e)        → WorkerFailed
//!           → Err(e)                                         → WorkerFailed
//! panic (factory or run) → WorkerError::Fail("worker panicked: ...") → WorkerFailed
//! ```
//!
//! ## Rules
//! - Publishes **exactly one** terminal event per attempt.
//! - The child token is cancelled when the attempt ends, so helpers spawned by
//!   the worker with that token never outlive the attempt.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::{
    error::WorkerError,
    events::{Bus, Event, EventKind},
    workers::WorkerSpec,
};

/// Executes one attempt of `spec`, publishing its terminal event to `bus`.
pub async fn run_once(
    spec: &WorkerSpec,
    parent: &CancellationToken,
    attempt: u32,
    bus: &Bus,
) -> Result<(), WorkerError> {
    let child = parent.child_token();
    let factory = spec.factory();

    let res = match std::panic::catch_unwind(AssertUnwindSafe(|| factory())) {
        Ok(Ok(worker)) => match AssertUnwindSafe(worker.run(child.clone()))
            .catch_unwind()
            .await
        {
            Ok(r) => r,
            Err(panic) => Err(panicked(&*panic)),
        },
        Ok(Err(e)) => Err(e),
        Err(panic) => Err(panicked(&*panic)),
    };
    child.cancel();

    let ev = match &res {
        Ok(()) | Err(WorkerError::Canceled) => Event::new(EventKind::WorkerStopped),
        Err(e) => Event::new(EventKind::WorkerFailed).with_reason(e.to_string()),
    };
    bus.publish(ev.with_worker(spec.id()).with_attempt(attempt));
    res
}

fn panicked(panic: &(dyn Any + Send)) -> WorkerError {
    WorkerError::fail(format!("worker panicked: {}", panic_message(panic)))
}

/// Extracts the message of a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BackoffPolicy, BoxWorker, RestartPolicy, WorkerFactory, WorkerFn};
    use std::sync::Arc;

    fn spec(factory: WorkerFactory) -> WorkerSpec {
        WorkerSpec::new("w", factory, RestartPolicy::Never, BackoffPolicy::immediate())
    }

    #[tokio::test]
    async fn test_failure_publishes_failed() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let spec = spec(WorkerFn::factory(|_stop: CancellationToken| async {
            Err(WorkerError::fail("boom"))
        }));

        let res = run_once(&spec, &CancellationToken::new(), 1, &bus).await;
        assert_eq!(res, Err(WorkerError::fail("boom")));

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::WorkerFailed);
        assert_eq!(ev.attempt, Some(1));
    }

    #[tokio::test]
    async fn test_factory_error_counts_as_failure() {
        let bus = Bus::new(8);
        let factory: WorkerFactory =
            Arc::new(|| Err::<BoxWorker, _>(WorkerError::fail("no session")));
        let res = run_once(&spec(factory), &CancellationToken::new(), 1, &bus).await;
        assert_eq!(res, Err(WorkerError::fail("no session")));
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        let bus = Bus::new(8);
        let spec = spec(WorkerFn::factory(|_stop: CancellationToken| async {
            if true {
                panic!("kaboom");
            }
            Ok(())
        }));

        match run_once(&spec, &CancellationToken::new(), 1, &bus).await {
            Err(WorkerError::Fail { error }) => assert!(error.contains("kaboom"), "{error}"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancellation_is_clean_stop() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let parent = CancellationToken::new();
        parent.cancel();
        let spec = spec(WorkerFn::factory(|stop: CancellationToken| async move {
            stop.cancelled().await;
            Err(WorkerError::Canceled)
        }));

        let res = run_once(&spec, &parent, 2, &bus).await;
        assert_eq!(res, Err(WorkerError::Canceled));
        assert_eq!(rx.recv().await.expect("event").kind, EventKind::WorkerStopped);
    }
}
