//! # LogWriter: events rendered through `tracing`
//!
//! Lifecycle noise goes to `debug`, restarts and failures to `warn`, fatal
//! and shutdown problems to `error`. Install any `tracing` subscriber to see
//! the output.

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that logs every event with `tracing`.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::WorkerStarting => debug!(worker, attempt = ?e.attempt, "worker starting"),
            EventKind::WorkerStopped => debug!(worker, attempt = ?e.attempt, "worker stopped"),
            EventKind::WorkerFailed => warn!(worker, attempt = ?e.attempt, reason, "worker failed"),
            EventKind::BackoffScheduled => warn!(
                worker,
                delay_ms = ?e.delay_ms,
                after_attempt = ?e.attempt,
                reason,
                "worker restart scheduled"
            ),
            EventKind::WorkerAdded => info!(worker, "worker added"),
            EventKind::WorkerRemoved => info!(worker, "worker removed"),
            EventKind::ActorExhausted => info!(worker, attempt = ?e.attempt, "worker finished"),
            EventKind::ActorDead => error!(worker, reason, "worker died"),
            EventKind::ShutdownRequested => info!(reason, "supervisor shutting down"),
            EventKind::AllStoppedWithin => info!("all workers stopped within grace"),
            EventKind::GraceExceeded => error!("shutdown grace exceeded"),
            EventKind::SubscriberOverflow => {
                warn!(subscriber = worker, reason, "subscriber dropped event")
            }
            EventKind::SubscriberPanicked => {
                error!(subscriber = worker, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::init_tracing;

    #[tokio::test]
    async fn test_renders_every_kind() {
        init_tracing();
        let writer = LogWriter::new();
        let kinds = [
            EventKind::WorkerStarting,
            EventKind::WorkerFailed,
            EventKind::BackoffScheduled,
            EventKind::ActorDead,
            EventKind::ShutdownRequested,
            EventKind::GraceExceeded,
            EventKind::SubscriberOverflow,
        ];
        for kind in kinds {
            writer
                .on_event(&Event::new(kind).with_worker("w").with_reason("boom"))
                .await;
        }
        assert_eq!(writer.name(), "log-writer");
    }
}
