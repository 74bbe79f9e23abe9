//! Team batting scrape command.

use std::process::ExitCode;
use std::sync::Arc;

use console::style;
use tokio_util::sync::CancellationToken;

use pitchlog::config::Settings;
use pitchlog::scrapers::{HttpClient, RateLimiter};
use pitchlog::services::TeamScrapeService;

use super::helpers::{open_store, team_years};

pub async fn cmd_scrape_teams(
    settings: &Settings,
    years: &[i32],
    reset_db: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<ExitCode> {
    let base_url = settings.base_url()?;
    let years = team_years(years);
    let store = open_store(settings, reset_db)?;
    let client = HttpClient::new(settings.request_timeout(), settings.user_agent.as_deref())?;

    let service = TeamScrapeService::new(
        Arc::new(client),
        RateLimiter::with_config(settings.rate_limit_config()),
        store,
        base_url,
        settings.retry_policy(),
    );

    println!(
        "{} Scraping team batting for {}",
        style("→").cyan(),
        years
            .iter()
            .map(|y| y.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    let report = service.scrape(&years, cancel).await;

    if report.cancelled {
        println!("{} Interrupted", style("!").yellow());
    }
    for year in &report.years_without_data {
        println!("  {} No team batting page for {}", style("-").dim(), year);
    }
    for (year, reason) in &report.failed_years {
        println!("  {} {}: {}", style("✗").red(), year, reason);
    }
    if !report.discarded.is_empty() {
        println!("  Discarded rows: {}", report.discarded);
    }

    if report.is_success() {
        println!(
            "{} Stored {} team rows for {} seasons",
            style("✓").green(),
            report.rows_stored,
            report.years_stored.len()
        );
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{} No team stats stored", style("✗").red());
        Ok(ExitCode::FAILURE)
    }
}
