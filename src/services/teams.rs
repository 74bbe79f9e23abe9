//! Team batting scrape service. One league page per season, fetched in
//! order.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::normalize::{normalize_team_table, DiscardCounts};
use crate::repository::Store;
use crate::scrapers::pages::{team_batting_url, TEAM_BATTING_TABLE_ID};
use crate::scrapers::{
    extract_table, fetch_with_retry, FetchError, PageFetcher, RateLimiter, RetryPolicy,
};

/// Totals for a finished team scrape.
#[derive(Debug, Clone, Default)]
pub struct TeamScrapeReport {
    pub years_stored: Vec<i32>,
    pub rows_stored: usize,
    pub years_without_data: Vec<i32>,
    /// Years skipped, with the reason.
    pub failed_years: Vec<(i32, String)>,
    pub discarded: DiscardCounts,
    pub cancelled: bool,
}

impl TeamScrapeReport {
    pub fn is_success(&self) -> bool {
        !self.years_stored.is_empty()
    }
}

/// Service for scraping league team batting tables.
pub struct TeamScrapeService {
    fetcher: Arc<dyn PageFetcher>,
    limiter: RateLimiter,
    store: Store,
    base_url: Url,
    retry: RetryPolicy,
}

impl TeamScrapeService {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        limiter: RateLimiter,
        store: Store,
        base_url: Url,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            limiter,
            store,
            base_url,
            retry,
        }
    }

    pub async fn scrape(&self, years: &[i32], cancel: &CancellationToken) -> TeamScrapeReport {
        let mut report = TeamScrapeReport::default();

        for &year in years {
            if cancel.is_cancelled() {
                break;
            }

            let url = team_batting_url(&self.base_url, year);
            let markup = match fetch_with_retry(
                self.fetcher.as_ref(),
                &self.limiter,
                url.as_str(),
                &self.retry,
                cancel,
            )
            .await
            {
                Ok(Some(markup)) => markup,
                Ok(None) => {
                    info!("No team batting page for {}", year);
                    report.years_without_data.push(year);
                    continue;
                }
                Err(FetchError::Cancelled) => break,
                Err(e) => {
                    warn!("Failed to fetch team batting for {}: {}", year, e);
                    report.failed_years.push((year, e.to_string()));
                    continue;
                }
            };

            let rows = match extract_table(&markup, TEAM_BATTING_TABLE_ID) {
                Ok(rows) => rows,
                Err(e) => {
                    warn!("Skipping team batting for {}: {}", year, e);
                    report.failed_years.push((year, e.to_string()));
                    continue;
                }
            };

            let (records, discarded) = normalize_team_table(&rows, year);
            report.discarded.absorb(&discarded);
            debug!("{}: {} team rows, {} discarded", year, records.len(), discarded.total());

            let store = self.store.clone();
            let written =
                tokio::task::spawn_blocking(move || store.merge_team_stats(&records)).await;
            match written {
                Ok(Ok(count)) => {
                    report.rows_stored += count;
                    report.years_stored.push(year);
                }
                Ok(Err(e)) => {
                    warn!("Failed to store team batting for {}: {}", year, e);
                    report.failed_years.push((year, e.to_string()));
                }
                Err(e) => {
                    report
                        .failed_years
                        .push((year, format!("merge task failed: {}", e)));
                }
            }
        }

        report.cancelled = cancel.is_cancelled();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::RateLimitConfig;
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::TempDir;

    const BASE: &str = "https://stats.test";

    struct OnePage {
        url: String,
        markup: String,
    }

    #[async_trait]
    impl PageFetcher for OnePage {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            if url == self.url {
                Ok(self.markup.clone())
            } else {
                Err(FetchError::NotFound)
            }
        }
    }

    const TABLE: &str = r#"
        <!--
        <table id="teams_standard_batting">
          <thead><tr><th data-stat="team_name">Tm</th><th data-stat="G">G</th><th data-stat="HR">HR</th></tr></thead>
          <tbody>
            <tr><th data-stat="team_name"><a href="/teams/ATL/2023.shtml">Atlanta Braves</a></th><td data-stat="G">162</td><td data-stat="HR">307</td></tr>
            <tr><th data-stat="team_name"><a href="/teams/NYM/2023.shtml">New York Mets</a></th><td data-stat="G">162</td><td data-stat="HR">215</td></tr>
            <tr><th data-stat="team_name">League Average</th><td data-stat="G">162</td><td data-stat="HR">209</td></tr>
          </tbody>
        </table>
        -->"#;

    #[tokio::test]
    async fn test_scrapes_commented_table() {
        let dir = TempDir::new().unwrap();
        let store = Store::initialize(&dir.path().join("test.db"), false).unwrap();
        let base = Url::parse(BASE).unwrap();
        let fetcher = OnePage {
            url: team_batting_url(&base, 2023).to_string(),
            markup: format!("<html><body>{}</body></html>", TABLE),
        };
        let svc = TeamScrapeService::new(
            Arc::new(fetcher),
            RateLimiter::with_config(RateLimitConfig::from_rate(0.0)),
            store.clone(),
            base,
            RetryPolicy {
                max_attempts: 1,
                base_delay: Duration::from_millis(1),
            },
        );

        let report = svc.scrape(&[2022, 2023], &CancellationToken::new()).await;

        assert!(report.is_success());
        assert_eq!(report.years_stored, vec![2023]);
        assert_eq!(report.years_without_data, vec![2022]);
        assert_eq!(report.rows_stored, 2);
        assert_eq!(report.discarded.total(), 1);

        let atl = store.get_team_stats(Some("atl"), Some(2023)).unwrap();
        assert_eq!(atl.len(), 1);
        assert_eq!(atl[0].stat("home_runs").and_then(|v| v.as_i64()), Some(307));
    }
}
