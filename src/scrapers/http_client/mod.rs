//! reqwest-backed page fetcher.

mod retry;
mod user_agent;

pub use retry::{fetch_with_retry, RetryPolicy};
pub use user_agent::{UserAgent, USER_AGENT};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use tracing::{debug, trace};

use super::{FetchError, PageFetcher};

/// HTTP client that classifies responses into [`FetchError`]s.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Build a client. `user_agent` is the raw setting, see [`UserAgent`].
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(UserAgent::from_setting(user_agent).header_value())
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(FetchError::Network)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let has_retry_after = response.headers().contains_key(RETRY_AFTER);

        debug!(
            url,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "GET"
        );

        match status.as_u16() {
            _ if status.is_success() => {}
            404 => return Err(FetchError::NotFound),
            429 => return Err(FetchError::RateLimited),
            _ if has_retry_after => return Err(FetchError::RateLimited),
            code => return Err(FetchError::Status(code)),
        }

        let body = response.text().await?;
        trace!(url, bytes = body.len(), "Read body");
        Ok(body)
    }
}
