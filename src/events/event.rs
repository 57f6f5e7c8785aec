//! # Runtime events emitted by the supervisor and worker actors.
//!
//! [`EventKind`] classifies events into:
//! - **Lifecycle**: one worker attempt (starting, stopped, failed, backoff)
//! - **Management**: worker registration changes (added, removed)
//! - **Terminal**: actor final states (exhausted, dead) and supervisor shutdown
//! - **Subscriber**: problems delivering events to subscribers
//!
//! ## Ordering guarantees
//! Every event gets a process-wide, monotonically increasing `seq`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use fleetvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_worker("instance-poller")
//!     .with_reason("throttled")
//!     .with_attempt(3)
//!     .with_delay(Duration::from_secs(2));
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.worker.as_deref(), Some("instance-poller"));
//! assert_eq!(ev.delay_ms, Some(2000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked while processing an event.
    ///
    /// Sets `worker` (subscriber name) and `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets `worker` (subscriber name) and `reason`.
    SubscriberOverflow,

    // === Shutdown events ===
    /// Supervisor shutdown started (kill or fatal error).
    ///
    /// Sets `reason` when caused by a fatal error.
    ShutdownRequested,

    /// All workers stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some workers did not stop in time.
    GraceExceeded,

    // === Worker lifecycle events ===
    /// Worker attempt is starting.
    ///
    /// Sets `worker` and `attempt` (1-based, per actor).
    WorkerStarting,

    /// Worker attempt ended cleanly (returned `Ok` or observed cancellation).
    ///
    /// Sets `worker` and `attempt`.
    WorkerStopped,

    /// Worker attempt failed.
    ///
    /// Sets `worker`, `attempt` and `reason`.
    WorkerFailed,

    /// Next attempt scheduled after a non-fatal failure.
    ///
    /// Sets `worker`, `attempt` (the failed one), `delay_ms` and `reason`.
    BackoffScheduled,

    // === Management events ===
    /// Worker registered and its actor spawned.
    ///
    /// Sets `worker`.
    WorkerAdded,

    /// Worker removed from the supervisor (after its actor exited).
    ///
    /// Sets `worker`.
    WorkerRemoved,

    // === Actor terminal states ===
    /// Actor finished and its restart policy forbids another run.
    ///
    /// Sets `worker` and `attempt`.
    ActorExhausted,

    /// Actor ended on an error classified as fatal, or panicked.
    ///
    /// Sets `worker`, `attempt` (if known) and `reason`.
    ActorDead,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Worker id (or subscriber name for subscriber events).
    pub worker: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Backoff delay before the next attempt, in milliseconds.
    pub delay_ms: Option<u32>,
}

impl Event {
    /// Creates an event of the given kind with the current time and the next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            reason: None,
            attempt: None,
            delay_ms: None,
        }
    }

    /// Attaches a worker id.
    #[inline]
    pub fn with_worker(mut self, id: impl Into<Arc<str>>) -> Self {
        self.worker = Some(id.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds, saturating).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    /// Creates a subscriber overflow event.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_worker(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_worker(subscriber)
            .with_reason(info)
    }

    /// True if the event concerns a subscriber rather than a worker.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
