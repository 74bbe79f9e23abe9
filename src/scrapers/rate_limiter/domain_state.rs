//! Pacing state kept for one host.

use std::time::{Duration, Instant};

use super::config::RateLimitConfig;

/// How a request to a host turned out, as far as pacing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// 429, 503, or an explicit Retry-After.
    Throttled,
    /// Any other 5xx.
    ServerError,
    /// 4xx other than 429, including 404.
    ClientError,
}

impl Outcome {
    /// Classify an HTTP error status.
    pub fn from_status(status: u16) -> Self {
        match status {
            429 | 503 => Self::Throttled,
            500..=599 => Self::ServerError,
            _ => Self::ClientError,
        }
    }
}

/// What recording an outcome did to a host's spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shift {
    Unchanged,
    Slowed,
    Eased,
    Recovered,
}

#[derive(Debug, Clone)]
pub(crate) struct DomainState {
    pub spacing: Duration,
    next_slot: Option<Instant>,
    streak: u32,
    pub backing_off: bool,
    pub requests: u64,
    pub throttled: u64,
}

impl DomainState {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            next_slot: None,
            streak: 0,
            backing_off: false,
            requests: 0,
            throttled: 0,
        }
    }

    /// Claim the next start slot and return how long to sleep before it.
    pub fn reserve(&mut self, now: Instant) -> Duration {
        let start = self.next_slot.filter(|next| *next > now).unwrap_or(now);
        self.next_slot = Some(start + self.spacing);
        self.requests += 1;
        start - now
    }

    pub fn apply(&mut self, outcome: Outcome, config: &RateLimitConfig) -> Shift {
        match outcome {
            Outcome::Success => self.on_success(config),
            Outcome::Throttled => {
                self.throttled += 1;
                self.streak = 0;
                self.backing_off = true;
                self.spacing = self
                    .spacing
                    .mul_f64(config.backoff_multiplier)
                    .max(config.min_delay)
                    .min(config.max_delay);
                Shift::Slowed
            }
            Outcome::ServerError => {
                self.streak = 0;
                self.spacing = self.spacing.mul_f64(1.5).min(config.max_delay);
                Shift::Slowed
            }
            Outcome::ClientError => Shift::Unchanged,
        }
    }

    fn on_success(&mut self, config: &RateLimitConfig) -> Shift {
        self.streak += 1;
        if !self.backing_off || self.streak < config.recovery_threshold {
            return Shift::Unchanged;
        }
        self.streak = 0;
        self.spacing = self
            .spacing
            .mul_f64(config.recovery_multiplier)
            .max(config.min_delay);
        if self.spacing <= config.base_delay {
            self.spacing = config.base_delay;
            self.backing_off = false;
            Shift::Recovered
        } else {
            Shift::Eased
        }
    }
}
