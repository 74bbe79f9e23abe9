//! Pitcher scrape command.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use console::style;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use pitchlog::config::{ConfigError, Settings};
use pitchlog::scrapers::{HttpClient, RateLimiter};
use pitchlog::services::{
    PitcherScrapeConfig, PitcherScrapeService, ScrapeEvent, ScrapeReport, SeasonStatus,
};

use super::helpers::{
    job_progress, load_player_ids, open_store, order_players, pitcher_years, StoredPlayers,
};

/// Where the players to scrape come from.
pub enum PlayerSource {
    File(PathBuf),
    Single {
        player_id: String,
        player_name: Option<String>,
    },
}

/// Arguments of `scrape pitchers`.
pub struct PitcherArgs {
    pub source: PlayerSource,
    pub update_names: bool,
    pub years: Vec<i32>,
    pub limit: Option<usize>,
    pub stored: StoredPlayers,
    pub reset_db: bool,
    pub concurrency: Option<usize>,
}

/// Player ids in priority order plus any names given on the command line.
fn resolve_players(
    source: &PlayerSource,
) -> Result<(Vec<String>, HashMap<String, String>), ConfigError> {
    match source {
        PlayerSource::File(path) => Ok((load_player_ids(path)?, HashMap::new())),
        PlayerSource::Single {
            player_id,
            player_name,
        } => {
            let player_id = player_id.trim();
            if player_id.is_empty() {
                return Err(ConfigError::Invalid("--player-id must not be blank".into()));
            }
            let names = player_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| (player_id.to_string(), name.to_string()))
                .into_iter()
                .collect();
            Ok((vec![player_id.to_string()], names))
        }
    }
}

/// Set a stored player's name without fetching anything. Returns false
/// when the player is not stored.
fn update_name(settings: &Settings, args: &PitcherArgs) -> anyhow::Result<bool> {
    let (ids, names) = resolve_players(&args.source)?;
    let (Some(player_id), Some(name)) = (ids.first(), ids.first().and_then(|id| names.get(id)))
    else {
        return Err(
            ConfigError::Invalid("--update-names needs --player-id and --player-name".into())
                .into(),
        );
    };

    let store = open_store(settings, args.reset_db)?;
    if store.rename_player(player_id, name)? {
        println!("{} Updated name for {} to '{}'", style("✓").green(), player_id, name);
        Ok(true)
    } else {
        println!("{} {} is not in the database", style("✗").red(), player_id);
        Ok(false)
    }
}

/// Scrape game logs for the requested players.
pub async fn cmd_scrape_pitchers(
    settings: &Settings,
    args: PitcherArgs,
    cancel: &CancellationToken,
) -> anyhow::Result<ExitCode> {
    if args.update_names {
        return Ok(if update_name(settings, &args)? {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    // Everything that can reject the run is checked before the first request.
    let (ids, name_overrides) = resolve_players(&args.source)?;
    if ids.is_empty() {
        if let PlayerSource::File(path) = &args.source {
            println!("{} No player ids in {}", style("!").yellow(), path.display());
        }
        return Ok(ExitCode::FAILURE);
    }
    let concurrency = args.concurrency.unwrap_or(settings.concurrency);
    if concurrency == 0 {
        return Err(ConfigError::Invalid("--concurrency must be at least 1".into()).into());
    }
    let base_url = settings.base_url()?;
    let seasons = pitcher_years(&args.years, settings.first_year);

    let store = open_store(settings, args.reset_db)?;
    let existing = match args.stored {
        StoredPlayers::Scrape => HashSet::new(),
        StoredPlayers::Last | StoredPlayers::Skip => store.players_with_games()?,
    };
    let players = order_players(ids, &existing, args.stored, args.limit);
    if players.is_empty() {
        println!("{} Every player is already stored", style("✓").green());
        return Ok(ExitCode::SUCCESS);
    }

    let client = HttpClient::new(settings.request_timeout(), settings.user_agent.as_deref())?;
    let season_count = seasons.len();
    let service = PitcherScrapeService::new(
        Arc::new(client),
        RateLimiter::with_config(settings.rate_limit_config()),
        store,
        PitcherScrapeConfig {
            base_url,
            seasons,
            concurrency,
            retry: settings.retry_policy(),
            name_overrides,
        },
    );

    println!(
        "{} Scraping {} players across {} seasons",
        style("→").cyan(),
        players.len(),
        season_count
    );

    let pb = job_progress(service.job_count(&players));
    let (event_tx, mut event_rx) = mpsc::channel::<ScrapeEvent>(100);
    let display = tokio::spawn({
        let pb = pb.clone();
        async move {
            while let Some(event) = event_rx.recv().await {
                match event {
                    ScrapeEvent::PassStarted { jobs, retry } => {
                        if retry {
                            pb.set_length(pb.length().unwrap_or(0) + jobs as u64);
                            pb.println(format!(
                                "{} Retrying {} failed seasons",
                                style("↻").yellow(),
                                jobs
                            ));
                        }
                    }
                    ScrapeEvent::SeasonFinished {
                        player_id,
                        season,
                        status,
                    } => {
                        pb.inc(1);
                        pb.set_message(format!("{} {}", player_id, season));
                        if let SeasonStatus::Unparsed(reason) = status {
                            pb.println(format!(
                                "  {} {} {}: {}",
                                style("?").yellow(),
                                player_id,
                                season,
                                reason
                            ));
                        }
                    }
                    ScrapeEvent::PlayerStored { .. } => {}
                    ScrapeEvent::PlayerFailed { player_id, error } => {
                        pb.println(format!(
                            "  {} {}: {}",
                            style("✗").red(),
                            player_id,
                            error
                        ));
                    }
                }
            }
        }
    });

    let report = service.scrape(&players, cancel, event_tx).await;
    let _ = display.await;
    pb.finish_and_clear();

    print_report(&report);
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_report(report: &ScrapeReport) {
    if report.cancelled {
        println!("{} Interrupted", style("!").yellow());
    }

    let mark = if report.is_success() {
        style("✓").green()
    } else {
        style("✗").red()
    };
    println!(
        "{} Stored {}/{} players ({} games)",
        mark, report.players_stored, report.players_attempted, report.games_stored
    );

    if report.seasons_without_data > 0 {
        println!("  {} seasons had no game log", report.seasons_without_data);
    }
    if report.seasons_unparsed > 0 {
        println!(
            "  {} seasons had no readable table",
            report.seasons_unparsed
        );
    }
    if !report.discarded.is_empty() {
        println!("  Discarded rows: {}", report.discarded);
    }
    if !report.failed_seasons.is_empty() {
        println!(
            "  {} {} seasons failed after retrying:",
            style("✗").red(),
            report.failed_seasons.len()
        );
        for (player_id, season) in &report.failed_seasons {
            println!("    {} {}", player_id, season);
        }
    }
    if !report.failed_players.is_empty() {
        println!(
            "  {} Could not store: {}",
            style("✗").red(),
            report.failed_players.join(", ")
        );
    }
}
