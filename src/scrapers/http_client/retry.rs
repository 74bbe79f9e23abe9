//! Bounded retry with exponential backoff around a [`PageFetcher`].

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::scrapers::rate_limiter::{Outcome, RateLimiter};
use crate::scrapers::{FetchError, PageFetcher};

/// How many times to try a page and how long to wait between tries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

async fn report(limiter: &RateLimiter, host: Option<&str>, result: &Result<String, FetchError>) {
    let Some(host) = host else {
        return;
    };
    let outcome = match result {
        Ok(_) => Outcome::Success,
        Err(FetchError::RateLimited) => Outcome::Throttled,
        Err(FetchError::NotFound) => Outcome::ClientError,
        Err(FetchError::Status(code)) => Outcome::from_status(*code),
        Err(_) => return,
    };
    limiter.record(host, outcome).await;
}

/// Fetch `url`, pacing through `limiter` and retrying transient failures.
///
/// A not-found response is `Ok(None)` and is never retried.
pub async fn fetch_with_retry(
    fetcher: &dyn PageFetcher,
    limiter: &RateLimiter,
    url: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<Option<String>, FetchError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let host = tokio::select! {
            host = limiter.acquire(url) => host,
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
        };

        let result = fetcher.fetch(url).await;
        report(limiter, host.as_deref(), &result).await;

        let err = match result {
            Ok(body) => return Ok(Some(body)),
            Err(FetchError::NotFound) => {
                debug!("No page at {}", url);
                return Ok(None);
            }
            Err(e) => e,
        };

        if !err.is_transient() || attempt >= max_attempts {
            return Err(err);
        }

        let delay = policy.delay_for(attempt);
        warn!(
            "Attempt {}/{} for {} failed: {}; retrying in {:?}",
            attempt, max_attempts, url, err, delay
        );
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::rate_limiter::RateLimitConfig;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct Scripted {
        responses: Mutex<Vec<Result<String, FetchError>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(mut responses: Vec<Result<String, FetchError>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for Scripted {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.responses.lock().unwrap().pop();
            next.unwrap_or(Err(FetchError::Status(500)))
        }
    }

    fn fast() -> (RateLimiter, RetryPolicy) {
        (
            RateLimiter::with_config(RateLimitConfig::from_rate(0.0)),
            RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
            },
        )
    }

    const URL: &str = "https://example.com/page";

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let (limiter, policy) = fast();
        let fetcher = Scripted::new(vec![Err(FetchError::Timeout), Ok("<html/>".into())]);
        let cancel = CancellationToken::new();

        let body = fetch_with_retry(&fetcher, &limiter, URL, &policy, &cancel)
            .await
            .unwrap();
        assert_eq!(body.as_deref(), Some("<html/>"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let (limiter, policy) = fast();
        let fetcher = Scripted::new(vec![Err(FetchError::NotFound)]);
        let cancel = CancellationToken::new();

        let body = fetch_with_retry(&fetcher, &limiter, URL, &policy, &cancel)
            .await
            .unwrap();
        assert!(body.is_none());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let (limiter, policy) = fast();
        let fetcher = Scripted::new(vec![
            Err(FetchError::Status(503)),
            Err(FetchError::RateLimited),
            Err(FetchError::Status(502)),
        ]);
        let cancel = CancellationToken::new();

        let err = fetch_with_retry(&fetcher, &limiter, URL, &policy, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status(502)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);

        let stats = limiter.stats().await;
        assert_eq!(stats["example.com"].throttled, 2);
    }

    #[tokio::test]
    async fn test_permanent_error_fails_fast() {
        let (limiter, policy) = fast();
        let fetcher = Scripted::new(vec![Err(FetchError::Status(403))]);
        let cancel = CancellationToken::new();

        let err = fetch_with_retry(&fetcher, &limiter, URL, &policy, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status(403)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_fetch() {
        let (limiter, policy) = fast();
        let fetcher = Scripted::new(vec![Ok("never".into())]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fetch_with_retry(&fetcher, &limiter, URL, &policy, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Cancelled));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }
}
