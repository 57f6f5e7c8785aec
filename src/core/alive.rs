//! # Worker liveness tracker with sequence-based ordering.
//!
//! Folds lifecycle events into "which workers are inside an attempt right
//! now". Events can reach the listener out of publication order (they come
//! from many tasks), so each worker remembers the last `seq` it applied and
//! rejects older ones.
//!
//! ## Rules
//! - Only `WorkerStarting` / `WorkerStopped` / `WorkerFailed` change liveness.
//! - Other events for a worker only advance its `seq`.
//! - Reads are eventually consistent with the bus.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};

#[derive(Debug, Clone, Copy)]
struct WorkerState {
    last_seq: u64,
    alive: bool,
}

/// Thread-safe tracker of workers currently running an attempt.
#[derive(Default)]
pub struct AliveTracker {
    state: RwLock<HashMap<String, WorkerState>>,
}

impl AliveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `ev` if it is newer than the last event seen for its worker.
    ///
    /// Returns true if liveness changed state or was (re)asserted.
    pub async fn update(&self, ev: &Event) -> bool {
        if ev.is_subscriber_event() {
            return false;
        }
        let Some(id) = ev.worker.as_deref() else {
            return false;
        };

        let mut state = self.state.write().await;
        let entry = state.entry(id.to_string()).or_insert(WorkerState {
            last_seq: 0,
            alive: false,
        });
        if ev.seq <= entry.last_seq {
            return false;
        }
        entry.last_seq = ev.seq;

        match ev.kind {
            EventKind::WorkerStarting => {
                entry.alive = true;
                true
            }
            EventKind::WorkerStopped | EventKind::WorkerFailed => {
                entry.alive = false;
                true
            }
            _ => false,
        }
    }

    /// Sorted ids of workers currently inside an attempt.
    pub async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut alive: Vec<String> = state
            .iter()
            .filter(|(_, ws)| ws.alive)
            .map(|(id, _)| id.clone())
            .collect();
        alive.sort_unstable();
        alive
    }

    /// True if the worker is currently inside an attempt.
    pub async fn is_alive(&self, id: &str) -> bool {
        self.state
            .read()
            .await
            .get(id)
            .is_some_and(|ws| ws.alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stale_events_are_rejected() {
        let tracker = AliveTracker::new();
        let starting = Event::new(EventKind::WorkerStarting).with_worker("w");
        let stopped = Event::new(EventKind::WorkerStopped).with_worker("w");

        assert!(tracker.update(&stopped).await);
        assert!(!tracker.update(&starting).await, "older event must be ignored");
        assert!(!tracker.is_alive("w").await);
    }

    #[tokio::test]
    async fn test_snapshot_is_sorted() {
        let tracker = AliveTracker::new();
        for id in ["b", "a", "c"] {
            tracker
                .update(&Event::new(EventKind::WorkerStarting).with_worker(id))
                .await;
        }
        tracker
            .update(&Event::new(EventKind::WorkerFailed).with_worker("c"))
            .await;
        assert_eq!(tracker.snapshot().await, vec!["a", "b"]);
    }
}
