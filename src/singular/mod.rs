//! # Mastership-gated coordination.
//!
//! A replicated set of processes each own one [`Singular`]. Every replica
//! registers the same singleton workers; only the replica whose oracle
//! connection currently points at the store's primary actually runs them.
//!
//! ```text
//!   replica 1            replica 2            replica 3
//!   Singular ─┐          Singular ─┐          Singular ─┐
//!   Supervisor│          Supervisor│ (runs)   Supervisor│
//!             └─ Conn ──►  replicated store  ◄── Conn ──┘
//!                          primary = replica 2
//! ```
//!
//! - [`Conn`]: the oracle (ping + is_master).
//! - [`ConnectionIsFatal`]: fatal policy for the wrapped supervisor.
//! - [`CoordinatorState`] / [`Mastership`]: what the poll loop believes.
//! - [`SingularConfig`]: poll cadence.

mod config;
mod conn;
mod coordinator;
mod state;

pub use config::SingularConfig;
pub use conn::{Conn, ConnectionIsFatal};
pub use coordinator::Singular;
pub use state::{CoordinatorState, Mastership};
