//! # Backoff policy for restarting failed workers.
//!
//! [`BackoffPolicy`] computes the delay before the next attempt of a worker
//! that failed with a non-fatal error. The delay for the `n`-th consecutive
//! failure (0-indexed) is `first × factor^n`, clamped to `max`, then jittered.
//! The base is derived from the failure count only, so jitter output never
//! feeds back into later delays.
//!
//! A successful attempt resets the failure count in the actor.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use fleetvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! assert_eq!(backoff.next(1), Duration::from_millis(200));
//! assert_eq!(backoff.next(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Maximum delay.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization applied to each computed delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `first = 3s`, `factor = 1.0` (constant), `max = 30s`, no jitter.
    ///
    /// A constant few-second restart delay suits singleton workers: they are
    /// few, and a crash loop should not hammer the cloud backend.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(3),
            max: Duration::from_secs(30),
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// A policy that retries immediately. Mostly useful in tests.
    pub fn immediate() -> Self {
        Self {
            first: Duration::ZERO,
            max: Duration::ZERO,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Computes the delay after `failures` consecutive failures (0-indexed).
    pub fn next(&self, failures: u32) -> Duration {
        let exp = failures.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };

        match self.jitter {
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            other => other.apply(base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp(first_ms: u64, max: Duration, jitter: JitterPolicy) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max,
            factor: 2.0,
            jitter,
        }
    }

    #[test]
    fn test_exponential_growth_no_jitter() {
        let policy = exp(100, Duration::from_secs(30), JitterPolicy::None);
        assert_eq!(policy.next(0), Duration::from_millis(100));
        assert_eq!(policy.next(1), Duration::from_millis(200));
        assert_eq!(policy.next(2), Duration::from_millis(400));
        assert_eq!(policy.next(4), Duration::from_millis(1600));
    }

    #[test]
    fn test_default_is_constant() {
        let policy = BackoffPolicy::default();
        for failures in 0..10 {
            assert_eq!(policy.next(failures), Duration::from_secs(3));
        }
    }

    #[test]
    fn test_clamped_to_max() {
        let policy = exp(100, Duration::from_secs(1), JitterPolicy::None);
        assert_eq!(policy.next(10), Duration::from_secs(1));
        assert_eq!(policy.next(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_first_exceeds_max() {
        let policy = BackoffPolicy {
            first: Duration::from_secs(10),
            max: Duration::from_secs(5),
            factor: 2.0,
            jitter: JitterPolicy::None,
        };
        assert_eq!(policy.next(0), Duration::from_secs(5));
    }

    #[test]
    fn test_equal_jitter_stays_within_half_and_base() {
        let policy = exp(100, Duration::from_secs(30), JitterPolicy::Equal);
        for failures in 0..12 {
            let base = (100.0 * 2.0f64.powi(failures as i32)).min(30_000.0) as u64;
            let delay = policy.next(failures);
            assert!(delay >= Duration::from_millis(base / 2), "{failures}: {delay:?}");
            assert!(delay <= Duration::from_millis(base), "{failures}: {delay:?}");
        }
    }

    #[test]
    fn test_full_jitter_never_exceeds_base() {
        let policy = exp(100, Duration::from_secs(30), JitterPolicy::Full);
        for failures in 5..15 {
            let base = (100.0 * 2.0f64.powi(failures as i32)).min(30_000.0) as u64;
            assert!(policy.next(failures) <= Duration::from_millis(base));
        }
    }

    #[test]
    fn test_immediate_is_zero() {
        assert_eq!(BackoffPolicy::immediate().next(7), Duration::ZERO);
    }
}
