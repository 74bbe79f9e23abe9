//! Fetching and table extraction for the stats site.

pub mod extract;
pub mod http_client;
pub mod pages;
pub mod rate_limiter;

pub use extract::{extract_table, ExtractError, RawCell, RawRow};
pub use http_client::{fetch_with_retry, HttpClient, RetryPolicy};
pub use rate_limiter::{RateLimitConfig, RateLimiter};

use async_trait::async_trait;
use thiserror::Error;

/// A failed page fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The entity has no page for the period. Not retried.
    #[error("page not found")]
    NotFound,

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("rate limited by server")]
    RateLimited,

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(reqwest::Error),

    #[error("cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status(code) => *code >= 500 || *code == 408,
            Self::RateLimited | Self::Timeout => true,
            Self::Network(e) => e.is_connect() || e.is_request() || e.is_body(),
            Self::NotFound | Self::Cancelled => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(e)
        }
    }
}

/// Anything that can turn a URL into page markup.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::Status(503).is_transient());
        assert!(FetchError::Status(500).is_transient());
        assert!(FetchError::RateLimited.is_transient());
        assert!(FetchError::Timeout.is_transient());
        assert!(!FetchError::Status(403).is_transient());
        assert!(!FetchError::NotFound.is_transient());
        assert!(!FetchError::Cancelled.is_transient());
    }
}
