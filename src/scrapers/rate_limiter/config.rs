//! Rate limiter configuration and statistics.

use std::time::Duration;

/// Pacing knobs shared by every host.
///
/// `base_delay` is the spacing between request starts at the configured
/// rate. Throttling multiplies it by `backoff_multiplier` up to `max_delay`;
/// each `recovery_threshold` successes while backing off multiply it by
/// `recovery_multiplier` until it is back at `base_delay`.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub base_delay: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub recovery_multiplier: f64,
    pub recovery_threshold: u32,
}

impl Default for RateLimitConfig {
    /// One request per second.
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            recovery_multiplier: 0.8,
            recovery_threshold: 5,
        }
    }
}

impl RateLimitConfig {
    /// Spacing for a target request rate. Non-positive rates disable spacing.
    pub fn from_rate(requests_per_second: f64) -> Self {
        let base_delay = if requests_per_second.is_finite() && requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };
        let defaults = Self::default();
        Self {
            base_delay,
            min_delay: defaults.min_delay.min(base_delay),
            ..defaults
        }
    }

    /// The same configuration with every delay stretched by `factor`.
    pub fn slower(&self, factor: f64) -> Self {
        let factor = factor.max(1.0);
        Self {
            base_delay: self.base_delay.mul_f64(factor),
            min_delay: self.min_delay.mul_f64(factor),
            max_delay: self.max_delay.max(self.base_delay.mul_f64(factor)),
            ..self.clone()
        }
    }
}

/// Pacing counters for one host.
#[derive(Debug, Clone)]
pub struct HostStats {
    pub spacing: Duration,
    pub backing_off: bool,
    pub requests: u64,
    pub throttled: u64,
}
