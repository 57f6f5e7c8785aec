//! # Fatal-error classification.
//!
//! A [`FatalPolicy`] tells the supervisor which worker errors are restartable
//! and which ones must bring the whole supervisor down. When several workers
//! fail fatally during the same shutdown, [`FatalPolicy::more_important`]
//! picks the error that `wait()` reports.
//!
//! ```text
//! WorkerActor ── Err(e) ──► policy.is_fatal(&e)
//!                              ├─ false → backoff, restart
//!                              └─ true  → ActorDead, supervisor records e and shuts down
//! ```

use async_trait::async_trait;

use crate::error::WorkerError;

/// Classifies worker errors for a [`Supervisor`](crate::Supervisor).
#[async_trait]
pub trait FatalPolicy: Send + Sync + 'static {
    /// Returns true if `err` must stop the whole supervisor.
    async fn is_fatal(&self, err: &WorkerError) -> bool;

    /// Returns true if `candidate` should replace `current` as the reported error.
    ///
    /// The default keeps the first fatal error.
    fn more_important(&self, candidate: &WorkerError, current: &WorkerError) -> bool {
        let _ = (candidate, current);
        false
    }
}

/// Treats only [`WorkerError::Fatal`] as fatal; everything else is restarted.
#[derive(Clone, Copy, Debug, Default)]
pub struct FatalOnly;

#[async_trait]
impl FatalPolicy for FatalOnly {
    async fn is_fatal(&self, err: &WorkerError) -> bool {
        matches!(err, WorkerError::Fatal { .. })
    }
}
