//! # Restart policies for worker actors.
//!
//! [`RestartPolicy`] determines whether a worker is started again after an attempt ends.
//!
//! Singleton workers are usually long-running loops that only return when asked to
//! stop or when something broke, so [`RestartPolicy::OnFailure`] is the default:
//!
//! ```text
//! RestartPolicy::OnFailure      → worker crashes → restart with backoff
//!                                 worker returns Ok → removed from the supervisor
//! RestartPolicy::Always {
//!     interval: Some(Duration)  → periodic job: run, wait interval, repeat
//! }
//! RestartPolicy::Never          → one-shot: runs once whatever the outcome
//! ```

use std::time::Duration;

/// Policy controlling whether a worker is restarted after completion or failure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Never restart: the worker runs once and is then removed.
    Never,
    /// Restart only after a non-fatal failure (default).
    #[default]
    OnFailure,
    /// Restart after every attempt.
    ///   - `interval: None` → restart immediately after success
    ///   - `interval: Some(dur)` → wait `dur` after success before the next run
    ///
    /// Failures still go through the backoff policy.
    Always {
        /// Delay between successful completions.
        interval: Option<Duration>,
    },
}

impl RestartPolicy {
    /// Whether a worker that returned `Ok(())` should run again.
    pub fn restarts_after_success(&self) -> bool {
        matches!(self, RestartPolicy::Always { .. })
    }

    /// Whether a worker that failed with a non-fatal error should run again.
    pub fn restarts_after_failure(&self) -> bool {
        !matches!(self, RestartPolicy::Never)
    }

    /// Delay to apply after a successful attempt, if any.
    pub fn success_interval(&self) -> Option<Duration> {
        match self {
            RestartPolicy::Always { interval } => interval.filter(|d| !d.is_zero()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_restarts_only_failures() {
        let p = RestartPolicy::default();
        assert!(p.restarts_after_failure());
        assert!(!p.restarts_after_success());
    }

    #[test]
    fn test_zero_interval_is_none() {
        let p = RestartPolicy::Always {
            interval: Some(Duration::ZERO),
        };
        assert_eq!(p.success_interval(), None);
        assert!(!RestartPolicy::Never.restarts_after_failure());
    }
}
