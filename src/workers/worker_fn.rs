//! # Closure-backed workers (`WorkerFn`)
//!
//! [`WorkerFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`. Every
//! worker built from it calls the closure once, producing a fresh future per
//! run, so there is no hidden mutation between restarts.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use fleetvisor::{WorkerError, WorkerFactory, WorkerFn};
//!
//! let factory: WorkerFactory = WorkerFn::factory(|stop: CancellationToken| async move {
//!     stop.cancelled().await;
//!     Ok::<_, WorkerError>(())
//! });
//! assert!(factory().is_ok());
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::workers::worker::{BoxWorker, Worker, WorkerFactory};

/// Function-backed worker.
pub struct WorkerFn<F> {
    f: Arc<F>,
}

impl<F, Fut> WorkerFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    /// Creates a worker that runs `f` once.
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }

    /// Creates a factory producing a new `WorkerFn` over the same closure on each call.
    pub fn factory(f: F) -> WorkerFactory {
        let f = Arc::new(f);
        Arc::new(move || {
            Ok::<BoxWorker, WorkerError>(Box::new(WorkerFn { f: Arc::clone(&f) }))
        })
    }
}

#[async_trait]
impl<F, Fut> Worker for WorkerFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    async fn run(self: Box<Self>, stop: CancellationToken) -> Result<(), WorkerError> {
        (self.f)(stop).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_factory_builds_fresh_runs() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let factory = WorkerFn::factory(move |_stop: CancellationToken| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        for _ in 0..3 {
            let worker = factory().expect("factory");
            worker.run(CancellationToken::new()).await.expect("run");
        }
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_worker_sees_cancellation() {
        let worker = WorkerFn::new(|stop: CancellationToken| async move {
            stop.cancelled().await;
            Err(WorkerError::Canceled)
        });
        let stop = CancellationToken::new();
        stop.cancel();
        assert_eq!(
            Box::new(worker).run(stop).await,
            Err(WorkerError::Canceled)
        );
    }
}
