//! Query commands.

use std::process::ExitCode;

use console::style;
use serde::Serialize;

use pitchlog::config::Settings;
use pitchlog::models::{GameLogRecord, Player, PlayerSummary, StatValue};

use super::helpers::open_store;

#[derive(Serialize)]
struct PlayerReport<'a> {
    player: Option<&'a Player>,
    summary: &'a PlayerSummary,
    games: &'a [GameLogRecord],
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn stat(record: &GameLogRecord, column: &str) -> String {
    opt(record.stat(column).map(StatValue::to_string))
}

/// Print one player's summary and every stored game.
pub fn cmd_query_player(
    settings: &Settings,
    player_id: &str,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let store = open_store(settings, false)?;

    let Some(summary) = store.get_summary(player_id)? else {
        println!("{} No games stored for {}", style("!").yellow(), player_id);
        return Ok(ExitCode::FAILURE);
    };
    let player = store.get_player(player_id)?;
    let games = store.get_by_player(player_id)?;

    if json {
        let report = PlayerReport {
            player: player.as_ref(),
            summary: &summary,
            games: &games,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(ExitCode::SUCCESS);
    }

    let name = player
        .as_ref()
        .and_then(|p| p.player_name.as_deref())
        .unwrap_or("(unknown name)");
    println!("{} ({})", style(name).bold(), player_id);
    println!("{}", "-".repeat(60));
    println!("  Games:        {}", summary.games);
    println!("  Innings:      {}", opt(summary.total_innings));
    println!(
        "  Strikeouts:   {} ({} per game)",
        opt(summary.total_strikeouts),
        opt(summary.avg_strikeouts_per_game)
    );
    println!("  Walks:        {}", opt(summary.total_walks));
    println!("  Hits:         {}", opt(summary.total_hits));
    println!("  Earned runs:  {}", opt(summary.total_earned_runs));
    println!("  Average ERA:  {}", opt(summary.avg_era));
    println!();

    println!(
        "{:<12} {:<5} {:<5} {:<10} {:>5} {:>3} {:>3} {:>3} {:>3} {:>6}",
        "Date", "Tm", "Opp", "Result", "IP", "H", "ER", "BB", "SO", "ERA"
    );
    for game in &games {
        let opponent = match (&game.opponent_id, game.road_indicator) {
            (Some(opp), true) => format!("@{}", opp),
            (Some(opp), false) => opp.clone(),
            (None, _) => "-".to_string(),
        };
        println!(
            "{:<12} {:<5} {:<5} {:<10} {:>5} {:>3} {:>3} {:>3} {:>3} {:>6}",
            game.game_date.format("%Y-%m-%d"),
            opt(game.team_id.as_deref()),
            opponent,
            opt(game.game_result.as_deref()),
            stat(game, "innings_pitched"),
            stat(game, "hits"),
            stat(game, "earned_runs"),
            stat(game, "walks"),
            stat(game, "strikeouts"),
            stat(game, "era"),
        );
    }

    Ok(ExitCode::SUCCESS)
}

/// List every tracked player with their coverage.
pub fn cmd_query_players(settings: &Settings, json: bool) -> anyhow::Result<ExitCode> {
    let store = open_store(settings, false)?;
    let players = store.list_players()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&players)?);
        return Ok(ExitCode::SUCCESS);
    }

    if players.is_empty() {
        println!("{} No players stored yet", style("!").yellow());
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{:<12} {:<28} {:>6} {:>6} {:>6}  {}",
        "ID", "Name", "Games", "From", "To", "Updated"
    );
    println!("{}", "-".repeat(80));
    for player in &players {
        println!(
            "{:<12} {:<28} {:>6} {:>6} {:>6}  {}",
            player.player_id,
            opt(player.player_name.as_deref()),
            player.games,
            opt(player.first_year),
            opt(player.last_year),
            opt(player.last_updated.map(|t| t.format("%Y-%m-%d %H:%M")))
        );
    }
    println!();
    println!("{} players", players.len());

    Ok(ExitCode::SUCCESS)
}

/// List stored team batting rows, newest season first.
pub fn cmd_query_teams(
    settings: &Settings,
    team: Option<&str>,
    year: Option<i32>,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let store = open_store(settings, false)?;
    let rows = store.get_team_stats(team, year)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(ExitCode::SUCCESS);
    }

    if rows.is_empty() {
        println!("{} No team stats match", style("!").yellow());
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{:<6} {:>5} {:>4} {:>5} {:>5} {:>4} {:>6} {:>6}",
        "Team", "Year", "G", "R", "H", "HR", "BA", "OPS"
    );
    for row in &rows {
        let get = |column: &str| opt(row.stat(column).map(StatValue::to_string));
        println!(
            "{:<6} {:>5} {:>4} {:>5} {:>5} {:>4} {:>6} {:>6}",
            row.team_id,
            row.year,
            get("games"),
            get("runs"),
            get("hits"),
            get("home_runs"),
            get("batting_avg"),
            get("ops"),
        );
    }

    Ok(ExitCode::SUCCESS)
}
