//! Error types used by the fleetvisor runtime, workers, and mastership oracles.
//!
//! This module defines three enums:
//!
//! - [`RuntimeError`]: errors raised by a [`Runner`](crate::Runner) (supervisor or coordinator),
//!   both synchronously from its API and as the terminal result of `wait()`.
//! - [`WorkerError`]: errors raised by individual worker executions.
//! - [`ConnError`]: errors raised by a mastership oracle connection.
//!
//! All of them provide `as_label` for logs/metrics. They are `Clone` because a
//! terminal error is handed out to every caller of `wait()`.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the fleetvisor runtime.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum RuntimeError {
    /// A worker with this id is already registered.
    #[error("worker {id:?} already registered")]
    DuplicateId {
        /// The conflicting worker id.
        id: String,
    },

    /// The runner has terminated and no longer accepts requests.
    #[error("runner stopped")]
    Stopped,

    /// A worker failed with an error the fatal policy classified as fatal.
    #[error("worker {id:?} failed fatally: {source}")]
    Fatal {
        /// Id of the worker that produced the error.
        id: String,
        /// The worker error.
        source: WorkerError,
    },

    /// The mastership oracle could not be reached when the coordinator was created.
    #[error("cannot connect to mastership oracle: {source}")]
    Connect {
        /// The underlying connection error.
        source: ConnError,
    },

    /// The mastership oracle connection was lost while the coordinator was running.
    #[error("mastership oracle connection lost: {source}")]
    ConnectionLost {
        /// The underlying connection error.
        source: ConnError,
    },

    /// The supervisor wrapped by a coordinator exited while the coordinator was live.
    #[error("underlying supervisor stopped")]
    SupervisorStopped,

    /// Shutdown grace period was exceeded; some workers remained stuck.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Ids of the workers that did not shut down in time.
        stuck: Vec<String>,
    },

    /// A coordinator's poll loop caught a panic from its oracle or runner.
    #[error("coordinator panicked: {reason}")]
    Panicked {
        /// The panic message.
        reason: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use fleetvisor::RuntimeError;
    ///
    /// let err = RuntimeError::DuplicateId { id: "cleaner".into() };
    /// assert_eq!(err.as_label(), "runtime_duplicate_id");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::DuplicateId { .. } => "runtime_duplicate_id",
            RuntimeError::Stopped => "runtime_stopped",
            RuntimeError::Fatal { .. } => "runtime_worker_fatal",
            RuntimeError::Connect { .. } => "runtime_connect_failed",
            RuntimeError::ConnectionLost { .. } => "runtime_connection_lost",
            RuntimeError::SupervisorStopped => "runtime_supervisor_stopped",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Panicked { .. } => "runtime_coordinator_panicked",
        }
    }

    /// True if this error ended a runner (as opposed to rejecting one request).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RuntimeError::DuplicateId { .. })
    }
}

/// # Errors produced by worker execution.
///
/// Whether an error stops the whole supervisor is decided by the supervisor's
/// [`FatalPolicy`](crate::FatalPolicy), not by the variant alone; the default
/// policy treats only [`WorkerError::Fatal`] as fatal.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// Non-recoverable error (should not be retried).
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Execution failed but may succeed if retried.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Worker observed cancellation and exited.
    #[error("context cancelled")]
    Canceled,
}

impl WorkerError {
    /// Shorthand for [`WorkerError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        WorkerError::Fail {
            error: error.into(),
        }
    }

    /// Shorthand for [`WorkerError::Fatal`].
    pub fn fatal(error: impl Into<String>) -> Self {
        WorkerError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use fleetvisor::WorkerError;
    ///
    /// assert_eq!(WorkerError::fail("boom").as_label(), "worker_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Fatal { .. } => "worker_fatal",
            WorkerError::Fail { .. } => "worker_failed",
            WorkerError::Canceled => "worker_canceled",
        }
    }

    /// Indicates whether the error type is safe to retry.
    ///
    /// # Example
    /// ```
    /// use fleetvisor::WorkerError;
    ///
    /// assert!(WorkerError::fail("boom").is_retryable());
    /// assert!(!WorkerError::fatal("nope").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkerError::Fail { .. })
    }
}

/// # Errors produced by a mastership oracle connection.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnError {
    /// The connection is closed or the store is unreachable.
    #[error("connection unavailable: {error}")]
    Unavailable {
        /// The underlying error message.
        error: String,
    },

    /// The store answered, but the query could not be completed.
    #[error("query failed: {error}")]
    Query {
        /// The underlying error message.
        error: String,
    },
}

impl ConnError {
    /// Shorthand for [`ConnError::Unavailable`].
    pub fn unavailable(error: impl Into<String>) -> Self {
        ConnError::Unavailable {
            error: error.into(),
        }
    }

    /// Shorthand for [`ConnError::Query`].
    pub fn query(error: impl Into<String>) -> Self {
        ConnError::Query {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConnError::Unavailable { .. } => "conn_unavailable",
            ConnError::Query { .. } => "conn_query_failed",
        }
    }
}
