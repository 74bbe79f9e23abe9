//! Export commands.

use std::path::Path;
use std::process::ExitCode;

use console::style;

use pitchlog::config::Settings;
use pitchlog::export::{export_game_logs, export_team_stats};

use super::helpers::open_store;

pub fn cmd_export_gamelogs(
    settings: &Settings,
    player_id: Option<&str>,
    output: &Path,
) -> anyhow::Result<ExitCode> {
    let store = open_store(settings, false)?;
    let written = export_game_logs(&store, player_id, output)?;
    println!(
        "{} Wrote {} game logs to {}",
        style("✓").green(),
        written,
        output.display()
    );
    Ok(ExitCode::SUCCESS)
}

pub fn cmd_export_teams(settings: &Settings, output: &Path) -> anyhow::Result<ExitCode> {
    let store = open_store(settings, false)?;
    let written = export_team_stats(&store, output)?;
    println!(
        "{} Wrote {} team rows to {}",
        style("✓").green(),
        written,
        output.display()
    );
    Ok(ExitCode::SUCCESS)
}
