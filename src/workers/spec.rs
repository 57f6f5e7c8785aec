//! # Worker specification for supervised execution.
//!
//! [`WorkerSpec`] bundles a worker id, its factory and the restart/backoff
//! policies the supervisor applies to it. [`Runner::start_worker`](crate::Runner::start_worker)
//! builds one from the supervisor's config defaults; use
//! [`Supervisor::start_spec`](crate::Supervisor::start_spec) for per-worker policies.

use std::fmt;

use crate::{
    core::SupervisorConfig,
    policies::{BackoffPolicy, RestartPolicy},
    workers::WorkerFactory,
};

/// Specification for running a worker under supervision.
///
/// ## Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use fleetvisor::{RestartPolicy, SupervisorConfig, WorkerError, WorkerFn, WorkerSpec};
///
/// let factory = WorkerFn::factory(|_stop: CancellationToken| async move {
///     Ok::<(), WorkerError>(())
/// });
///
/// let spec = WorkerSpec::with_defaults("firewaller", factory, &SupervisorConfig::default())
///     .with_restart(RestartPolicy::Never);
/// assert_eq!(spec.id(), "firewaller");
/// ```
#[derive(Clone)]
pub struct WorkerSpec {
    id: String,
    factory: WorkerFactory,
    restart: RestartPolicy,
    backoff: BackoffPolicy,
}

impl WorkerSpec {
    /// Creates a specification with explicit policies.
    pub fn new(
        id: impl Into<String>,
        factory: WorkerFactory,
        restart: RestartPolicy,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            id: id.into(),
            factory,
            restart,
            backoff,
        }
    }

    /// Creates a specification inheriting restart/backoff from the supervisor config.
    pub fn with_defaults(id: impl Into<String>, factory: WorkerFactory, cfg: &SupervisorConfig) -> Self {
        Self::new(id, factory, cfg.restart, cfg.backoff)
    }

    /// Worker id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Factory invoked on every start.
    pub fn factory(&self) -> &WorkerFactory {
        &self.factory
    }

    /// Restart policy.
    pub fn restart(&self) -> RestartPolicy {
        self.restart
    }

    /// Backoff policy.
    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    /// Returns a new spec with an updated restart policy.
    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    /// Returns a new spec with an updated backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

impl fmt::Debug for WorkerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerSpec")
            .field("id", &self.id)
            .field("restart", &self.restart)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}
