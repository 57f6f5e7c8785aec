//! # fleetvisor
//!
//! **Fleetvisor** supervises async workers across a replicated set of
//! controller processes.
//!
//! It provides a restart-on-failure [`Supervisor`] for named workers and a
//! mastership-gated [`Singular`] coordinator on top of it: every replica
//! registers the same singleton workers, and only the replica that currently
//! holds mastership (as reported by an external replicated store) runs them.
//! Both implement [`Runner`], so one can stand in for the other.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  caller ── start_worker(id, factory) ──► Singular ──(only while master)──► Supervisor
//!                                             │                                 │
//!                                  every poll_interval                 one WorkerActor
//!                                             ▼                           per worker id
//!                                   Conn::ping / is_master                      │
//!                                   (replicated store primary)                  ▼
//!                                                                    Bus ──► AliveTracker
//!                                                                     └────► SubscriberSet
//!                                                                               └─► LogWriter, ...
//! ```
//!
//! ### Coordinator lifecycle
//! ```text
//! Unknown ──first successful poll──► Master ◄──────► NotMaster
//!    │                                  │                │
//!    └──── kill / ping failure / supervisor failure ─────┴──► Terminated (absorbing)
//!
//! NotMaster → Master : start every registered worker
//! Master → NotMaster : stop every running worker (each stop waits for exit)
//! → Terminated       : stop every running worker, then wait() returns
//! ```
//!
//! ### Worker lifecycle
//! ```text
//! loop {
//!   ├─► acquire semaphore (optional, cancellable)
//!   ├─► publish WorkerStarting{ worker, attempt }
//!   ├─► factory() + worker.run(stop)
//!   │       ├─ Ok / Canceled ──► WorkerStopped, restart per RestartPolicy
//!   │       └─ Err           ──► WorkerFailed
//!   │                            ├─ FatalPolicy::is_fatal ─► ActorDead, supervisor shuts down
//!   │                            └─ otherwise             ─► BackoffScheduled, sleep, retry
//!   └─ exit: stop_worker / kill / policy exhausted / fatal error
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                              |
//! |-------------------|---------------------------------------------------------------|-------------------------------------------------|
//! | **Coordination**  | Run singleton workers only on the master replica.             | [`Singular`], [`Conn`], [`ConnectionIsFatal`]   |
//! | **Supervision**   | Start, stop, restart named workers; escalate fatal errors.    | [`Runner`], [`Supervisor`], [`FatalPolicy`]     |
//! | **Workers**       | Define workers as types or closures.                          | [`Worker`], [`WorkerFn`], [`WorkerSpec`]        |
//! | **Policies**      | Restart and backoff strategies.                               | [`RestartPolicy`], [`BackoffPolicy`]            |
//! | **Subscriber API**| Hook into worker lifecycle events.                            | [`Subscribe`], [`Event`]                        |
//! | **Errors**        | Typed errors for runners, workers and oracle connections.     | [`RuntimeError`], [`WorkerError`], [`ConnError`]|
//!
//! ## Optional features
//! - `logging` (default): exports the built-in [`LogWriter`] subscriber.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use fleetvisor::{
//!     Conn, ConnError, ConnectionIsFatal, Runner, Singular, SingularConfig, Subscribe,
//!     Supervisor, SupervisorConfig, WorkerError, WorkerFn,
//! };
//!
//! struct Primary;
//!
//! #[async_trait]
//! impl Conn for Primary {
//!     async fn ping(&self) -> Result<(), ConnError> { Ok(()) }
//!     async fn is_master(&self) -> Result<bool, ConnError> { Ok(true) }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(fleetvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn Subscribe>> = Vec::new();
//!
//!     let conn: Arc<dyn Conn> = Arc::new(Primary);
//!     let sup = Supervisor::builder(SupervisorConfig::default())
//!         .with_subscribers(subs)
//!         .with_fatal_policy(Arc::new(ConnectionIsFatal::new(Arc::clone(&conn))))
//!         .build();
//!
//!     let cfg = SingularConfig { poll_interval: Duration::from_millis(100), ..Default::default() };
//!     let singular = Singular::new(sup.clone(), conn, cfg).await?;
//!
//!     singular.start_worker("compactor", WorkerFn::factory(|stop: CancellationToken| async move {
//!         while !stop.is_cancelled() {
//!             tokio::time::sleep(Duration::from_millis(10)).await;
//!         }
//!         Ok::<(), WorkerError>(())
//!     })).await?;
//!
//!     singular.kill();
//!     singular.wait().await?;
//!     sup.kill();
//!     sup.wait().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod policies;
mod runner;
mod singular;
mod subscribers;
mod workers;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use core::{FatalOnly, FatalPolicy, Supervisor, SupervisorBuilder, SupervisorConfig};
pub use error::{ConnError, RuntimeError, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy, RestartPolicy};
pub use runner::Runner;
pub use singular::{Conn, ConnectionIsFatal, CoordinatorState, Mastership, Singular, SingularConfig};
pub use subscribers::{Subscribe, SubscriberSet};
pub use workers::{BoxWorker, Worker, WorkerFactory, WorkerFn, WorkerSpec};

// Optional: the built-in subscriber that renders events through `tracing`.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
