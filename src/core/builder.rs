//! # Supervisor builder.
//!
//! ```text
//! Supervisor::builder(cfg)
//!     .with_subscribers(vec![...])      // optional, default: none
//!     .with_fatal_policy(Arc::new(..))  // optional, default: FatalOnly
//!     .build()                          // spawns listener + shutdown driver
//! ```

use std::sync::Arc;

use crate::{
    core::{
        config::SupervisorConfig,
        fatal::{FatalOnly, FatalPolicy},
        supervisor::Supervisor,
    },
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Supervisor`].
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    policy: Arc<dyn FatalPolicy>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            policy: Arc::new(FatalOnly),
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive runtime events (worker lifecycle, failures, shutdown)
    /// through dedicated tasks with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the policy that decides which worker errors take the supervisor down.
    pub fn with_fatal_policy(mut self, policy: Arc<dyn FatalPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Builds and starts the supervisor.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Arc<Supervisor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        Supervisor::start(self.cfg, bus, subs, self.policy)
    }
}
