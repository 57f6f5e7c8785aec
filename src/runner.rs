//! # The runner contract.
//!
//! [`Runner`] is the "run these named workers" interface shared by the plain
//! [`Supervisor`](crate::Supervisor) and the mastership-gated
//! [`Singular`](crate::Singular) coordinator. Code that only needs to register
//! workers takes an `Arc<dyn Runner>` and does not care which one it got.

use async_trait::async_trait;

use crate::{error::RuntimeError, workers::WorkerFactory};

/// Starts, stops and supervises named workers.
#[async_trait]
pub trait Runner: Send + Sync + 'static {
    /// Registers and starts a worker under `id`.
    ///
    /// Fails with [`RuntimeError::DuplicateId`] if `id` is already registered
    /// and with [`RuntimeError::Stopped`] once the runner has terminated.
    async fn start_worker(&self, id: &str, factory: WorkerFactory) -> Result<(), RuntimeError>;

    /// Stops and deregisters `id`.
    ///
    /// Returns once the worker's task has fully exited. Unknown ids succeed.
    async fn stop_worker(&self, id: &str) -> Result<(), RuntimeError>;

    /// Requests termination. Idempotent; does not wait.
    fn kill(&self);

    /// Waits for termination and returns the terminal result.
    ///
    /// `Ok(())` after a clean `kill`, the error that ended the runner otherwise.
    /// May be called any number of times, from any task.
    async fn wait(&self) -> Result<(), RuntimeError>;
}
