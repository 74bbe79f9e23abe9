//! Pitcher game-log scrape service.
//!
//! Fetches every (player, season) page with bounded concurrency, normalizes
//! the game-log tables and merges each player's batch once their seasons
//! are done. Merges run one at a time on the blocking pool, so the store is
//! never written concurrently and never held open across a fetch.
//!
//! Seasons that fail after retries are collected and tried once more at half
//! the concurrency and double the request spacing. Only the seasons fetched
//! in a pass are replaced in storage, so the retry pass cannot wipe seasons
//! stored by the first one.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::models::GameLogRecord;
use crate::normalize::{normalize_season, DiscardCounts};
use crate::repository::Store;
use crate::scrapers::pages::{extract_player_name, game_log_url, GAME_LOG_TABLE_ID};
use crate::scrapers::{
    extract_table, fetch_with_retry, FetchError, PageFetcher, RateLimiter, RetryPolicy,
};

/// Request spacing multiplier for the retry pass.
const RETRY_SLOWDOWN: f64 = 2.0;

/// What happened to one (player, season) page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeasonStatus {
    /// Page parsed; this many games survived normalization.
    Games(usize),
    /// The site has no page for the season.
    NoData,
    /// The page came back without a usable game-log table.
    Unparsed(String),
    /// The fetch failed after retries.
    Failed(String),
}

/// Events emitted during a scrape, for progress display.
#[derive(Debug, Clone)]
pub enum ScrapeEvent {
    /// Number of (player, season) jobs in the upcoming pass.
    PassStarted { jobs: usize, retry: bool },
    SeasonFinished {
        player_id: String,
        season: i32,
        status: SeasonStatus,
    },
    /// A player's batch was written.
    PlayerStored { player_id: String, games: usize },
    /// A player's batch could not be written.
    PlayerFailed { player_id: String, error: String },
}

/// Configuration for the pitcher scrape.
#[derive(Debug, Clone)]
pub struct PitcherScrapeConfig {
    pub base_url: Url,
    pub seasons: Vec<i32>,
    pub concurrency: usize,
    pub retry: RetryPolicy,
    /// Names to store instead of the ones read from the pages.
    pub name_overrides: HashMap<String, String>,
}

/// Totals for a finished scrape.
#[derive(Debug, Clone, Default)]
pub struct ScrapeReport {
    pub players_attempted: usize,
    pub players_stored: usize,
    pub games_stored: usize,
    pub seasons_without_data: usize,
    pub seasons_unparsed: usize,
    /// (player, season) pairs still failing after the retry pass.
    pub failed_seasons: Vec<(String, i32)>,
    /// Players whose merge failed.
    pub failed_players: Vec<String>,
    pub discarded: DiscardCounts,
    pub cancelled: bool,
}

impl ScrapeReport {
    /// A run succeeds when at least one player was stored.
    pub fn is_success(&self) -> bool {
        self.players_stored > 0
    }
}

/// Everything fetched for one player in one pass.
#[derive(Debug, Default)]
struct PlayerBatch {
    player_id: String,
    name: Option<String>,
    covered: Vec<i32>,
    records: Vec<GameLogRecord>,
    discarded: DiscardCounts,
    no_data: usize,
    unparsed: usize,
    failed: Vec<i32>,
}

/// Service for scraping pitcher game logs into the store.
pub struct PitcherScrapeService {
    fetcher: Arc<dyn PageFetcher>,
    limiter: RateLimiter,
    store: Store,
    config: PitcherScrapeConfig,
}

impl PitcherScrapeService {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        limiter: RateLimiter,
        store: Store,
        config: PitcherScrapeConfig,
    ) -> Self {
        Self {
            fetcher,
            limiter,
            store,
            config,
        }
    }

    /// Total (player, season) jobs for a first pass over `players`.
    pub fn job_count(&self, players: &[String]) -> usize {
        players.len() * self.config.seasons.len()
    }

    /// Scrape every player in order of priority.
    ///
    /// Cancelling the token stops new fetches. Seasons fetched before that
    /// are still merged, each in its own transaction, and the retry pass is
    /// skipped.
    pub async fn scrape(
        &self,
        players: &[String],
        cancel: &CancellationToken,
        event_tx: mpsc::Sender<ScrapeEvent>,
    ) -> ScrapeReport {
        let mut report = ScrapeReport {
            players_attempted: players.len(),
            ..Default::default()
        };
        let mut stored: HashSet<String> = HashSet::new();

        let jobs: Vec<(String, Vec<i32>)> = players
            .iter()
            .map(|id| (id.clone(), self.config.seasons.clone()))
            .collect();

        let concurrency = self.config.concurrency.max(1);
        let failed = self
            .run_pass(
                jobs,
                &self.limiter,
                concurrency,
                false,
                cancel,
                &event_tx,
                &mut report,
                &mut stored,
            )
            .await;

        let failed = if failed.is_empty() || cancel.is_cancelled() {
            failed
        } else {
            let retry_limiter =
                RateLimiter::with_config(self.limiter.config().slower(RETRY_SLOWDOWN));
            let retry_concurrency = (concurrency / 2).max(1);
            info!(
                "Retrying {} failed seasons at concurrency {}",
                failed.len(),
                retry_concurrency
            );

            let mut grouped: BTreeMap<String, Vec<i32>> = BTreeMap::new();
            for (player_id, season) in failed {
                grouped.entry(player_id).or_default().push(season);
            }
            // Keep the caller's priority order for the retry pass too.
            let retry_jobs: Vec<(String, Vec<i32>)> = players
                .iter()
                .filter_map(|id| grouped.remove(id).map(|seasons| (id.clone(), seasons)))
                .collect();

            self.run_pass(
                retry_jobs,
                &retry_limiter,
                retry_concurrency,
                true,
                cancel,
                &event_tx,
                &mut report,
                &mut stored,
            )
            .await
        };

        report.failed_seasons = failed;
        report.players_stored = stored.len();
        report.cancelled = cancel.is_cancelled();

        if !report.discarded.is_empty() {
            info!("Discarded rows: {}", report.discarded);
        }
        report
    }

    /// Run one pass and return the (player, season) pairs that failed.
    #[allow(clippy::too_many_arguments)]
    async fn run_pass(
        &self,
        jobs: Vec<(String, Vec<i32>)>,
        limiter: &RateLimiter,
        concurrency: usize,
        retry: bool,
        cancel: &CancellationToken,
        event_tx: &mpsc::Sender<ScrapeEvent>,
        report: &mut ScrapeReport,
        stored: &mut HashSet<String>,
    ) -> Vec<(String, i32)> {
        let total: usize = jobs.iter().map(|(_, seasons)| seasons.len()).sum();
        let _ = event_tx
            .send(ScrapeEvent::PassStarted { jobs: total, retry })
            .await;

        let mut failed = Vec::new();
        // After cancellation every remaining job returns without fetching.
        let mut batches = std::pin::pin!(stream::iter(jobs)
            .map(|(player_id, seasons)| {
                self.scrape_player(player_id, seasons, limiter, cancel, event_tx)
            })
            .buffer_unordered(concurrency));

        while let Some(batch) = batches.next().await {
            report.seasons_without_data += batch.no_data;
            report.seasons_unparsed += batch.unparsed;
            report.discarded.absorb(&batch.discarded);
            failed.extend(batch.failed.iter().map(|s| (batch.player_id.clone(), *s)));

            if batch.covered.is_empty() {
                debug!("Nothing fetched for {}, skipping merge", batch.player_id);
                continue;
            }

            let player_id = batch.player_id.clone();
            match self.merge(batch).await {
                Ok(games) => {
                    report.games_stored += games;
                    stored.insert(player_id.clone());
                    let _ = event_tx
                        .send(ScrapeEvent::PlayerStored { player_id, games })
                        .await;
                }
                Err(error) => {
                    warn!("Failed to store {}: {}", player_id, error);
                    if !report.failed_players.contains(&player_id) {
                        report.failed_players.push(player_id.clone());
                    }
                    let _ = event_tx
                        .send(ScrapeEvent::PlayerFailed { player_id, error })
                        .await;
                }
            }
        }

        failed
    }

    async fn merge(&self, batch: PlayerBatch) -> Result<usize, String> {
        let store = self.store.clone();
        let name = match self.config.name_overrides.get(&batch.player_id) {
            Some(name) => Some(name.clone()),
            None => batch.name,
        };
        let result = tokio::task::spawn_blocking(move || {
            store.merge_game_logs(
                &batch.player_id,
                &batch.covered,
                &batch.records,
                name.as_deref(),
            )
        })
        .await;

        match result {
            Ok(Ok(outcome)) => Ok(outcome.inserted),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(format!("merge task failed: {}", e)),
        }
    }

    /// Fetch a player's seasons one after another.
    async fn scrape_player(
        &self,
        player_id: String,
        seasons: Vec<i32>,
        limiter: &RateLimiter,
        cancel: &CancellationToken,
        event_tx: &mpsc::Sender<ScrapeEvent>,
    ) -> PlayerBatch {
        let mut batch = PlayerBatch {
            player_id: player_id.clone(),
            ..Default::default()
        };

        for season in seasons {
            if cancel.is_cancelled() {
                break;
            }

            let url = game_log_url(&self.config.base_url, &player_id, season);
            let status = match fetch_with_retry(
                self.fetcher.as_ref(),
                limiter,
                url.as_str(),
                &self.config.retry,
                cancel,
            )
            .await
            {
                Ok(None) => {
                    batch.covered.push(season);
                    batch.no_data += 1;
                    SeasonStatus::NoData
                }
                Ok(Some(markup)) => self.parse_season(&mut batch, &markup, season),
                Err(FetchError::Cancelled) => break,
                Err(e) => {
                    warn!("Failed to fetch {} {}: {}", player_id, season, e);
                    batch.failed.push(season);
                    SeasonStatus::Failed(e.to_string())
                }
            };

            let _ = event_tx
                .send(ScrapeEvent::SeasonFinished {
                    player_id: player_id.clone(),
                    season,
                    status,
                })
                .await;
        }

        batch
    }

    fn parse_season(&self, batch: &mut PlayerBatch, markup: &str, season: i32) -> SeasonStatus {
        if batch.name.is_none() {
            batch.name = extract_player_name(markup);
        }

        let rows = match extract_table(markup, GAME_LOG_TABLE_ID) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Skipping {} {}: {}", batch.player_id, season, e);
                batch.unparsed += 1;
                return SeasonStatus::Unparsed(e.to_string());
            }
        };

        let normalized = normalize_season(&rows, &batch.player_id, season);
        let games = normalized.records.len();
        debug!(
            "{} {}: {} rows, {} games",
            batch.player_id,
            season,
            rows.len(),
            games
        );

        batch.covered.push(season);
        batch.records.extend(normalized.records);
        batch.discarded.absorb(&normalized.discarded);
        SeasonStatus::Games(games)
    }
}
