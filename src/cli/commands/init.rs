//! Initialize command.

use std::process::ExitCode;

use console::style;

use pitchlog::config::Settings;
use pitchlog::repository::migrations;

use super::helpers::open_store;

/// Create or migrate the database file.
pub fn cmd_init(settings: &Settings, reset_db: bool) -> anyhow::Result<ExitCode> {
    let store = open_store(settings, reset_db)?;

    if reset_db {
        println!("{} Dropped existing tables", style("!").yellow());
    }
    println!(
        "{} Initialized {} (schema version {})",
        style("✓").green(),
        store.db_path().display(),
        migrations::latest_version()
    );

    Ok(ExitCode::SUCCESS)
}
