//! # Supervisor configuration.
//!
//! [`SupervisorConfig`] centralizes runtime settings and the default policies
//! handed to workers started through [`Runner::start_worker`](crate::Runner::start_worker).
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unlimited (no global semaphore created)
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::policies::{BackoffPolicy, RestartPolicy};

/// Global configuration for a [`Supervisor`](crate::Supervisor).
///
/// All fields are public. Prefer the helper accessors over checking the
/// sentinels directly.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum time to wait for workers to exit once the supervisor shuts down.
    ///
    /// If exceeded, `wait()` returns `RuntimeError::GraceExceeded` (unless a
    /// fatal worker error is already recorded, which takes precedence).
    pub grace: Duration,

    /// Maximum number of workers running an attempt at the same time (`0` = unlimited).
    pub max_concurrent: usize,

    /// Capacity of the event bus ring buffer.
    pub bus_capacity: usize,

    /// Default restart policy for workers.
    pub restart: RestartPolicy,

    /// Default backoff policy for worker restarts.
    pub backoff: BackoffPolicy,
}

impl SupervisorConfig {
    /// Global concurrency limit, `None` when unlimited.
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        match self.max_concurrent {
            0 => None,
            n => Some(n),
        }
    }

    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// - `grace = 30s`
    /// - `max_concurrent = 0` (unlimited)
    /// - `bus_capacity = 1024`
    /// - `restart = RestartPolicy::OnFailure`
    /// - `backoff = BackoffPolicy::default()` (constant 3s)
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            max_concurrent: 0,
            bus_capacity: 1024,
            restart: RestartPolicy::default(),
            backoff: BackoffPolicy::default(),
        }
    }
}
