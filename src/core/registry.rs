//! # Worker registry: owns the actor handles by worker id.
//!
//! ```text
//! Supervisor::start_spec(spec) ──► Registry::spawn(spec)
//!                                      ├─ id live            → DuplicateId
//!                                      └─ spawn actor task   → WorkerAdded
//! Supervisor::stop_worker(id)  ──► Registry::remove(id)
//!                                      └─ cancel → join      → WorkerRemoved
//! actor exits on its own       ──► Registry::release(id, generation)
//!                                                            → WorkerRemoved
//! shutdown                     ──► Registry::cancel_all()
//! ```
//!
//! ## Rules
//! - The check for a live id and the insert happen under one write lock.
//! - `remove` returns only after the actor task has finished.
//! - Each handle carries a generation so an actor that exits on its own never
//!   releases a newer handle registered under the same id.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::actor::{ActorExitReason, FatalReport, WorkerActor};
use crate::core::fatal::FatalPolicy;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::workers::WorkerSpec;

/// Handle to a running worker actor.
struct Handle {
    generation: u64,
    join: JoinHandle<ActorExitReason>,
    cancel: CancellationToken,
}

/// Registry of live worker actors.
pub struct Registry {
    workers: RwLock<HashMap<String, Handle>>,
    generation: AtomicU64,
    bus: Bus,
    runtime_token: CancellationToken,
    semaphore: Option<Arc<Semaphore>>,
    policy: Arc<dyn FatalPolicy>,
    fatal_tx: mpsc::UnboundedSender<FatalReport>,
}

impl Registry {
    pub fn new(
        bus: Bus,
        runtime_token: CancellationToken,
        semaphore: Option<Arc<Semaphore>>,
        policy: Arc<dyn FatalPolicy>,
        fatal_tx: mpsc::UnboundedSender<FatalReport>,
    ) -> Arc<Self> {
        Arc::new(Self {
            workers: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            bus,
            runtime_token,
            semaphore,
            policy,
            fatal_tx,
        })
    }

    /// Spawns an actor for `spec` and registers it.
    pub async fn spawn(self: &Arc<Self>, spec: WorkerSpec) -> Result<(), RuntimeError> {
        let id = spec.id().to_string();
        let mut workers = self.workers.write().await;

        if self.runtime_token.is_cancelled() {
            return Err(RuntimeError::Stopped);
        }
        if workers.contains_key(&id) {
            return Err(RuntimeError::DuplicateId { id });
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let cancel = self.runtime_token.child_token();
        let actor = WorkerActor::new(
            spec,
            self.bus.clone(),
            Arc::clone(&self.policy),
            self.semaphore.clone(),
            self.fatal_tx.clone(),
        );

        let registry = Arc::downgrade(self);
        let actor_token = cancel.clone();
        let actor_id = id.clone();
        let join = tokio::spawn(async move {
            let reason = actor.run(actor_token).await;
            if reason != ActorExitReason::Cancelled {
                if let Some(registry) = registry.upgrade() {
                    registry.release(&actor_id, generation).await;
                }
            }
            reason
        });

        workers.insert(
            id.clone(),
            Handle {
                generation,
                join,
                cancel,
            },
        );
        drop(workers);

        self.bus
            .publish(Event::new(EventKind::WorkerAdded).with_worker(id));
        Ok(())
    }

    /// Cancels the worker and waits for its actor to finish. Returns false if unknown.
    pub async fn remove(&self, id: &str) -> bool {
        let handle = self.workers.write().await.remove(id);
        match handle {
            Some(h) => {
                h.cancel.cancel();
                self.join_and_report(id, h.join).await;
                true
            }
            None => false,
        }
    }

    /// Cancels every worker, then joins them all.
    pub async fn cancel_all(&self) {
        let handles: Vec<(String, Handle)> = self.workers.write().await.drain().collect();

        for (_, h) in &handles {
            h.cancel.cancel();
        }
        for (id, h) in handles {
            self.join_and_report(&id, h.join).await;
        }
    }

    /// Sorted ids of registered workers.
    pub async fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.workers.read().await.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Drops the handle of an actor that exited on its own.
    ///
    /// Called from inside the actor's task, so the join handle is dropped, not awaited.
    async fn release(&self, id: &str, generation: u64) {
        let mut workers = self.workers.write().await;
        if workers.get(id).is_some_and(|h| h.generation == generation) {
            workers.remove(id);
            drop(workers);
            self.bus
                .publish(Event::new(EventKind::WorkerRemoved).with_worker(id));
        }
    }

    /// Awaits the actor, reports a panic as `ActorDead`, always emits `WorkerRemoved`.
    async fn join_and_report(&self, id: &str, join: JoinHandle<ActorExitReason>) {
        if let Err(e) = join.await {
            self.bus.publish(
                Event::new(EventKind::ActorDead)
                    .with_worker(id)
                    .with_reason(format!("actor_panic: {e}")),
            );
        }
        self.bus
            .publish(Event::new(EventKind::WorkerRemoved).with_worker(id));
    }
}
