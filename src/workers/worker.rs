//! # Worker abstraction.
//!
//! A [`Worker`] is consumed by a single run: the supervisor calls the
//! registered [`WorkerFactory`] for every start and every restart, so each run
//! begins from fresh state. Shared state across restarts must be captured
//! explicitly (e.g. an `Arc` in the factory closure).
//!
//! # Example
//! ```
//! use tokio_util::sync::CancellationToken;
//! use async_trait::async_trait;
//! use fleetvisor::{Worker, WorkerError};
//!
//! struct Reaper;
//!
//! #[async_trait]
//! impl Worker for Reaper {
//!     async fn run(self: Box<Self>, stop: CancellationToken) -> Result<(), WorkerError> {
//!         stop.cancelled().await;
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;

/// # Asynchronous, cancelable unit of work.
///
/// `run` receives a stop token. When it is cancelled the worker must exit
/// promptly: the supervisor's `stop_worker` does not return until `run` has
/// returned, and the mastership handoff waits on that.
#[async_trait]
pub trait Worker: Send + 'static {
    /// Runs until completion, failure, or cancellation of `stop`.
    ///
    /// Returning `Ok(())` or `Err(WorkerError::Canceled)` counts as a clean stop.
    async fn run(self: Box<Self>, stop: CancellationToken) -> Result<(), WorkerError>;
}

/// Owned worker trait object.
pub type BoxWorker = Box<dyn Worker>;

/// Creates a new worker instance for each start or restart.
///
/// A factory error is treated like a failed run: it is classified by the
/// supervisor's fatal policy and retried with backoff when non-fatal.
pub type WorkerFactory = Arc<dyn Fn() -> Result<BoxWorker, WorkerError> + Send + Sync>;
