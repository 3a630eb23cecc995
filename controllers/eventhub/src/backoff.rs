//! # Exponential Backoff
//!
//! Retry delays for failed reconcile passes. The delay for the n-th
//! consecutive failure is `base * 2^n`, capped at `max`, then scaled by a
//! random factor in [0.5, 1.5) so that rules failing together do not retry
//! together. The jittered delay never exceeds the cap.
//!
//! The calculation is stateless: the failure count lives in the resource's
//! status, so a restarted controller resumes the same schedule.

use rand::Rng;
use std::time::Duration;

/// Exponential backoff calculator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    /// Create a backoff starting at `base` and never exceeding `max`
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
        }
    }

    /// Upper bound of every delay this backoff returns
    #[must_use]
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Un-jittered delay for a given number of previous failures
    ///
    /// `attempt` 0 yields `base`, 1 yields `2 * base`, and so on up to `max`.
    #[must_use]
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        // 2^20 * base already exceeds any sensible cap
        let factor = 1u32 << attempt.min(20);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Jittered delay for a given number of previous failures
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        self.with_jitter(attempt, jitter)
    }

    fn with_jitter(&self, attempt: u32, jitter: f64) -> Duration {
        let nominal = self.nominal_delay(attempt);
        Duration::from_secs_f64(nominal.as_secs_f64() * jitter).min(self.max)
    }
}
