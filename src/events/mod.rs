//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor`, `Registry`, `WorkerActor`, `attempt::run_once`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the supervisor's listener (feeds `AliveTracker` and fans out
//!   to the `SubscriberSet`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
