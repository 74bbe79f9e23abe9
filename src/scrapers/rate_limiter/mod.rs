//! Per-host request pacing for the stats site.
//!
//! Every fetch reserves a start slot on its host before going out, so
//! concurrent tasks sharing one limiter never start closer together than the
//! host's current spacing. Throttling responses widen the spacing and a run
//! of successes narrows it back toward the configured rate.

mod config;
mod domain_state;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

pub use config::{HostStats, RateLimitConfig};
pub use domain_state::Outcome;
use domain_state::{DomainState, Shift};

/// Shared pacing state; clones gate the same hosts.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    hosts: Arc<Mutex<HashMap<String, DomainState>>>,
}

impl RateLimiter {
    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            config,
            hosts: Arc::default(),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn host_of(url: &str) -> Option<String> {
        Url::parse(url).ok()?.host_str().map(str::to_owned)
    }

    /// Wait for the next free start slot on the URL's host.
    ///
    /// Returns the host, or `None` when the URL has none and was not paced.
    pub async fn acquire(&self, url: &str) -> Option<String> {
        let host = Self::host_of(url)?;
        let wait = self
            .hosts
            .lock()
            .await
            .entry(host.clone())
            .or_insert_with(|| DomainState::new(self.config.base_delay))
            .reserve(Instant::now());

        if !wait.is_zero() {
            debug!(host = %host, ?wait, "Pacing request");
            tokio::time::sleep(wait).await;
        }
        Some(host)
    }

    /// Feed a response outcome back into the host's spacing.
    pub async fn record(&self, host: &str, outcome: Outcome) {
        let mut hosts = self.hosts.lock().await;
        let Some(state) = hosts.get_mut(host) else {
            return;
        };
        match state.apply(outcome, &self.config) {
            Shift::Slowed if outcome == Outcome::Throttled => {
                warn!(host, spacing = ?state.spacing, "Throttled, slowing down");
            }
            Shift::Slowed => debug!(host, spacing = ?state.spacing, "Server error, slowing down"),
            Shift::Eased => debug!(host, spacing = ?state.spacing, "Easing off backoff"),
            Shift::Recovered => info!(host, "Back to normal request rate"),
            Shift::Unchanged => {}
        }
    }

    pub async fn stats(&self) -> HashMap<String, HostStats> {
        self.hosts
            .lock()
            .await
            .iter()
            .map(|(host, state)| {
                let stats = HostStats {
                    spacing: state.spacing,
                    backing_off: state.backing_off,
                    requests: state.requests,
                    throttled: state.throttled,
                };
                (host.clone(), stats)
            })
            .collect()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::with_config(RateLimitConfig::default())
    }
}
