//! CSV export of stored result sets.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::models::{GameLogRecord, StatValue, TeamStatRecord};
use crate::repository::schema::{
    GAME_LOG_KEY_COLUMNS, GAME_LOG_STAT_COLUMNS, TEAM_KEY_COLUMNS, TEAM_STAT_COLUMNS,
};
use crate::repository::{RepositoryError, Store};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn cell(value: Option<&StatValue>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Header for game-log exports: identity first, then the stored columns.
pub fn game_log_header() -> Vec<&'static str> {
    let mut header = vec!["player_id", "player_name"];
    header.extend(
        GAME_LOG_KEY_COLUMNS
            .iter()
            .map(|c| c.name)
            .filter(|name| *name != "player_id"),
    );
    header.extend(GAME_LOG_STAT_COLUMNS.iter().map(|c| c.name));
    header
}

/// Write game logs as CSV. `names` maps player id to display name.
pub fn write_game_logs<W: Write>(
    writer: W,
    records: &[GameLogRecord],
    names: &HashMap<String, String>,
) -> Result<usize, ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(game_log_header())?;

    for record in records {
        let mut row = vec![
            record.player_id.clone(),
            names.get(&record.player_id).cloned().unwrap_or_default(),
            record.game_date.format("%Y-%m-%d").to_string(),
            record.year.to_string(),
            record.game_num.map(|n| n.to_string()).unwrap_or_default(),
            record.team_id.clone().unwrap_or_default(),
            record.opponent_id.clone().unwrap_or_default(),
            record.game_result.clone().unwrap_or_default(),
            u8::from(record.road_indicator).to_string(),
        ];
        row.extend(GAME_LOG_STAT_COLUMNS.iter().map(|c| cell(record.stat(c.name))));
        csv.write_record(&row)?;
    }

    csv.flush()?;
    Ok(records.len())
}

/// Write team stats as CSV.
pub fn write_team_stats<W: Write>(
    writer: W,
    records: &[TeamStatRecord],
) -> Result<usize, ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    let header: Vec<&str> = TEAM_KEY_COLUMNS
        .iter()
        .chain(TEAM_STAT_COLUMNS)
        .map(|c| c.name)
        .collect();
    csv.write_record(&header)?;

    for record in records {
        let mut row = vec![record.team_id.clone(), record.year.to_string()];
        row.extend(TEAM_STAT_COLUMNS.iter().map(|c| cell(record.stat(c.name))));
        csv.write_record(&row)?;
    }

    csv.flush()?;
    Ok(records.len())
}

fn create(path: &Path) -> Result<File, ExportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(File::create(path)?)
}

/// Export stored game logs, for one player or everyone, to `path`.
pub fn export_game_logs(
    store: &Store,
    player_id: Option<&str>,
    path: &Path,
) -> Result<usize, ExportError> {
    let records = match player_id {
        Some(id) => store.get_by_player(id)?,
        None => store.get_all()?,
    };
    let names: HashMap<String, String> = store
        .list_players()?
        .into_iter()
        .filter_map(|p| p.player_name.map(|name| (p.player_id, name)))
        .collect();

    let written = write_game_logs(create(path)?, &records, &names)?;
    info!("Exported {} game logs to {}", written, path.display());
    Ok(written)
}

/// Export every stored team row to `path`.
pub fn export_team_stats(store: &Store, path: &Path) -> Result<usize, ExportError> {
    let records = store.get_team_stats(None, None)?;
    let written = write_team_stats(create(path)?, &records)?;
    info!("Exported {} team rows to {}", written, path.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_identity_columns_first() {
        let header = game_log_header();
        assert_eq!(&header[..4], &["player_id", "player_name", "date_game", "year"]);
        assert_eq!(header.iter().filter(|h| **h == "player_id").count(), 1);
    }

    #[test]
    fn test_game_log_rows() {
        let date = NaiveDate::from_ymd_opt(2023, 4, 1).unwrap();
        let record = GameLogRecord::new("degroja01", date, 2023)
            .with_stat("strikeouts", Some(StatValue::Integer(9)))
            .with_stat("walks", None);
        let names = HashMap::from([("degroja01".to_string(), "Jacob deGrom".to_string())]);

        let mut out = Vec::new();
        write_game_logs(&mut out, &[record], &names).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let headers = reader.headers().unwrap().clone();
        let row = reader.records().next().unwrap().unwrap();
        let get = |name: &str| {
            let idx = headers.iter().position(|h| h == name).unwrap();
            row[idx].to_string()
        };
        assert_eq!(get("player_name"), "Jacob deGrom");
        assert_eq!(get("date_game"), "2023-04-01");
        assert_eq!(get("strikeouts"), "9");
        assert_eq!(get("walks"), "");
        assert_eq!(get("road_indicator"), "0");
    }

    #[test]
    fn test_export_files() {
        let dir = TempDir::new().unwrap();
        let store = Store::initialize(&dir.path().join("test.db"), false).unwrap();
        let date = NaiveDate::from_ymd_opt(2023, 4, 1).unwrap();
        store
            .merge_game_logs(
                "doej01",
                &[2023],
                &[GameLogRecord::new("doej01", date, 2023)],
                Some("John Doe"),
            )
            .unwrap();
        store
            .merge_team_stats(&[TeamStatRecord::new("ATL", 2023)
                .with_stat("home_runs", Some(StatValue::Integer(307)))])
            .unwrap();

        let games = dir.path().join("out/games.csv");
        assert_eq!(export_game_logs(&store, None, &games).unwrap(), 1);
        let text = fs::read_to_string(&games).unwrap();
        assert!(text.lines().nth(1).unwrap().starts_with("doej01,John Doe,2023-04-01,2023"));

        let teams = dir.path().join("teams.csv");
        assert_eq!(export_team_stats(&store, &teams).unwrap(), 1);
        let text = fs::read_to_string(&teams).unwrap();
        assert!(text.starts_with("team_id,year,games"));
        assert!(text.contains("ATL,2023,"));
    }
}
