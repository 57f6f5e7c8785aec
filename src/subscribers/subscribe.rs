//! # Event subscriber trait.
//!
//! Each subscriber gets a dedicated worker task fed by a bounded queue
//! (capacity via [`Subscribe::queue_capacity`]). A slow subscriber only
//! affects its own queue; on overflow the event is dropped for that
//! subscriber and `EventKind::SubscriberOverflow` is published. Panics are
//! caught and published as `EventKind::SubscriberPanicked`.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use fleetvisor::{Event, EventKind, Subscribe};
//!
//! struct CrashCounter;
//!
//! #[async_trait]
//! impl Subscribe for CrashCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::WorkerFailed) {
//!             // bump a counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "crash-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for runtime observability.
///
/// Events are delivered in FIFO order per subscriber, from a dedicated task.
/// Implementations should not block the executor.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic events. Defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to at least 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
