//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod export;
mod init;
mod pitchers;
mod query;
mod teams;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use super::helpers::{self, StoredPlayers};
use pitchers::{PitcherArgs, PlayerSource};

#[derive(Parser)]
#[command(name = "pitchlog")]
#[command(about = "Pitching game-log and team batting stats collector")]
#[command(version)]
pub struct Cli {
    /// Settings file path (defaults to ./pitchlog.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides the settings file)
    #[arg(long, global = true, env = "PITCHLOG_DB")]
    db_path: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Create or migrate the database without scraping
    Init {
        /// Drop existing tables first (destroys stored data)
        #[arg(long)]
        reset_db: bool,
    },

    /// Fetch stats from the site into the database
    Scrape {
        #[command(subcommand)]
        command: ScrapeCommands,
    },

    /// Read stored stats
    Query {
        #[command(subcommand)]
        command: QueryCommands,
    },

    /// Write stored stats to CSV
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
}

#[derive(Subcommand)]
enum ScrapeCommands {
    /// Scrape pitcher game logs for the players in a CSV file
    Pitchers {
        /// CSV with a player_id (or Pitcher_ID) column; row order is priority
        #[arg(short, long, default_value = "players.csv", conflicts_with = "player_id")]
        input: PathBuf,
        /// Scrape this one player instead of an input file
        #[arg(long)]
        player_id: Option<String>,
        /// Store this name for --player-id instead of the one on the page
        #[arg(long, requires = "player_id")]
        player_name: Option<String>,
        /// Only set --player-name on the stored player; nothing is fetched
        #[arg(long, requires = "player_name")]
        update_names: bool,
        /// Seasons to scrape (default: first_year through this year)
        #[arg(short, long, value_delimiter = ',', num_args = 1..)]
        years: Vec<i32>,
        /// Scrape at most this many players
        #[arg(short, long)]
        limit: Option<usize>,
        /// Leave out players that already have stored games
        #[arg(long, conflicts_with = "new_first")]
        skip_existing: bool,
        /// Scrape players without stored games first, stored ones after
        #[arg(long)]
        new_first: bool,
        /// Drop existing tables first (destroys stored data)
        #[arg(long)]
        reset_db: bool,
        /// Players fetched concurrently (overrides the settings file)
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Scrape league team batting tables
    Teams {
        /// Seasons to scrape (default: this year)
        #[arg(short, long, value_delimiter = ',', num_args = 1..)]
        years: Vec<i32>,
        /// Drop existing tables first (destroys stored data)
        #[arg(long)]
        reset_db: bool,
    },
}

#[derive(Subcommand)]
enum QueryCommands {
    /// Show one player's summary and game list
    Player {
        /// Player ID (e.g. degroja01)
        player_id: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List tracked players
    Players {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List stored team batting rows
    Teams {
        /// Team code (e.g. ATL)
        #[arg(long)]
        team: Option<String>,
        /// Season
        #[arg(long)]
        year: Option<i32>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ExportCommands {
    /// Export game logs with player id and name first
    Gamelogs {
        /// Only this player
        #[arg(long)]
        player: Option<String>,
        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Export team batting rows
    Teams {
        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Parse arguments and run the chosen command. Cancelling `cancel` stops
/// scrapes from issuing new requests.
pub async fn run(cancel: CancellationToken) -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let settings = helpers::load_settings(cli.config.as_deref(), cli.db_path)?;

    match cli.command {
        Commands::Init { reset_db } => init::cmd_init(&settings, reset_db),
        Commands::Scrape { command } => match command {
            ScrapeCommands::Pitchers {
                input,
                player_id,
                player_name,
                update_names,
                years,
                limit,
                skip_existing,
                new_first,
                reset_db,
                concurrency,
            } => {
                let stored = if skip_existing {
                    StoredPlayers::Skip
                } else if new_first {
                    StoredPlayers::Last
                } else {
                    StoredPlayers::Scrape
                };
                let args = PitcherArgs {
                    source: match player_id {
                        Some(id) => PlayerSource::Single {
                            player_id: id,
                            player_name,
                        },
                        None => PlayerSource::File(input),
                    },
                    update_names,
                    years,
                    limit,
                    stored,
                    reset_db,
                    concurrency,
                };
                pitchers::cmd_scrape_pitchers(&settings, args, &cancel).await
            }
            ScrapeCommands::Teams { years, reset_db } => {
                teams::cmd_scrape_teams(&settings, &years, reset_db, &cancel).await
            }
        },
        Commands::Query { command } => match command {
            QueryCommands::Player { player_id, json } => {
                query::cmd_query_player(&settings, &player_id, json)
            }
            QueryCommands::Players { json } => query::cmd_query_players(&settings, json),
            QueryCommands::Teams { team, year, json } => {
                query::cmd_query_teams(&settings, team.as_deref(), year, json)
            }
        },
        Commands::Export { command } => match command {
            ExportCommands::Gamelogs { player, output } => {
                export::cmd_export_gamelogs(&settings, player.as_deref(), &output)
            }
            ExportCommands::Teams { output } => export::cmd_export_teams(&settings, &output),
        },
    }
}
