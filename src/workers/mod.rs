//! # Worker abstractions and specifications.
//!
//! - [`Worker`] - trait for one run of an async, cancelable unit of work
//! - [`BoxWorker`] - owned trait object produced by a factory
//! - [`WorkerFactory`] - creates a fresh worker for every (re)start
//! - [`WorkerFn`] - closure-backed worker and factory helpers
//! - [`WorkerSpec`] - id + factory + restart/backoff policies

mod spec;
mod worker;
mod worker_fn;

pub use spec::WorkerSpec;
pub use worker::{BoxWorker, Worker, WorkerFactory};
pub use worker_fn::WorkerFn;
