//! # Coordinator configuration.

use std::time::Duration;

/// Configuration for a [`Singular`](crate::Singular) coordinator.
#[derive(Clone, Debug)]
pub struct SingularConfig {
    /// Period between mastership checks.
    ///
    /// Bounds how long a handoff takes: a replica that gains or loses
    /// mastership notices within one interval.
    pub poll_interval: Duration,

    /// Capacity of the command queue between handles and the poll loop.
    pub command_capacity: usize,
}

impl SingularConfig {
    /// Poll interval clamped to a minimum of 1ms.
    #[inline]
    pub fn poll_interval_clamped(&self) -> Duration {
        self.poll_interval.max(Duration::from_millis(1))
    }

    /// Command queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn command_capacity_clamped(&self) -> usize {
        self.command_capacity.max(1)
    }
}

impl Default for SingularConfig {
    /// - `poll_interval = 10s`
    /// - `command_capacity = 64`
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            command_capacity: 64,
        }
    }
}
