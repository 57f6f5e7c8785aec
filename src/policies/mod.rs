//! Restart and backoff policies for supervised workers.
//!
//! - [`RestartPolicy`] decides **whether** a worker runs again after an attempt ends.
//! - [`BackoffPolicy`] decides **how long** to wait before retrying after a non-fatal failure.
//! - [`JitterPolicy`] randomizes that wait so that a fleet of replicas which lost
//!   the same dependency does not retry in lockstep.
//!
//! ```text
//! WorkerSpec { restart, backoff }
//!      └─► core::actor::WorkerActor:
//!           - restart decides continue/exit after each attempt
//!           - backoff.next(failures) schedules the retry after a non-fatal error
//! ```
//!
//! Fatal errors bypass both policies: they stop the whole supervisor.

mod backoff;
mod jitter;
mod restart;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use restart::RestartPolicy;
