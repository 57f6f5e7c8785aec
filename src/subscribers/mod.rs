//! # Event subscribers.
//!
//! ```text
//! WorkerActor ── publish(Event) ──► Bus ──► supervisor listener ──► SubscriberSet
//!                                                         │          ├─► LogWriter
//!                                                         │          └─► custom ...
//!                                                         └──► AliveTracker
//! ```
//!
//! Implement [`Subscribe`] to plug in metrics, audit trails or test journals.

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
