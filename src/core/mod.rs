//! Runtime core: supervision and lifecycle.
//!
//! The public API from this module is [`Supervisor`] with its builder and
//! configuration, plus the [`FatalPolicy`] seam.
//!
//! Internal modules:
//! - [`attempt`]: runs one attempt of a worker and publishes its terminal event;
//! - [`actor`]: runs a single worker with restart policy and backoff;
//! - [`registry`]: owns actor handles by worker id;
//! - [`alive`]: folds lifecycle events into the set of running workers;
//! - [`supervisor`]: wires everything together and drives shutdown.

mod actor;
mod alive;
mod attempt;
mod builder;
mod config;
mod fatal;
mod registry;
mod supervisor;

pub(crate) use attempt::panic_message;
pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use fatal::{FatalOnly, FatalPolicy};
pub use supervisor::Supervisor;
