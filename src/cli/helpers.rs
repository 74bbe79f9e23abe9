//! Shared helper functions for CLI commands.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use pitchlog::config::{ConfigError, Settings};
use pitchlog::repository::Store;

/// Input CSV column names accepted for player ids, in preference order.
const PLAYER_ID_COLUMNS: &[&str] = &["player_id", "Pitcher_ID"];

/// Load settings and apply the global `--db-path` override.
pub fn load_settings(
    config: Option<&Path>,
    db_path: Option<PathBuf>,
) -> Result<Settings, ConfigError> {
    let mut settings = Settings::load(config)?;
    if let Some(path) = db_path {
        settings.database_path = path;
    }
    Ok(settings)
}

/// Open (creating or migrating) the configured database.
pub fn open_store(settings: &Settings, reset: bool) -> anyhow::Result<Store> {
    let store = Store::initialize(&settings.database_path, reset)?;
    debug!("Using database {}", store.db_path().display());
    Ok(store)
}

/// Read player ids from a CSV file. Blank ids are skipped, duplicates
/// collapsed, and file order kept.
pub fn load_player_ids(path: &Path) -> Result<Vec<String>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingInput(path.to_path_buf()));
    }
    let csv_error = |source| ConfigError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;
    let headers = reader.headers().map_err(csv_error)?.clone();
    let column = PLAYER_ID_COLUMNS
        .iter()
        .find_map(|name| headers.iter().position(|h| h == *name))
        .ok_or_else(|| ConfigError::MissingColumn {
            path: path.to_path_buf(),
        })?;

    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_error)?;
        let Some(id) = row.get(column).filter(|id| !id.is_empty()) else {
            continue;
        };
        if seen.insert(id.to_string()) {
            ids.push(id.to_string());
        }
    }

    if ids.is_empty() {
        warn!("No player ids found in {}", path.display());
    }
    Ok(ids)
}

/// What to do with input players that already have stored games.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredPlayers {
    Scrape,
    /// Scrape them after every new player.
    Last,
    Skip,
}

/// Apply the stored-player policy, then `limit`.
pub fn order_players(
    ids: Vec<String>,
    existing: &HashSet<String>,
    stored: StoredPlayers,
    limit: Option<usize>,
) -> Vec<String> {
    let mut ordered = match stored {
        StoredPlayers::Scrape => ids,
        StoredPlayers::Last | StoredPlayers::Skip => {
            let (fresh, known): (Vec<_>, Vec<_>) =
                ids.into_iter().partition(|id| !existing.contains(id));
            if stored == StoredPlayers::Skip {
                info!("Skipping {} players already in the database", known.len());
                fresh
            } else {
                debug!("{} already stored players moved to the end", known.len());
                fresh.into_iter().chain(known).collect()
            }
        }
    };

    if let Some(max) = limit {
        ordered.truncate(max);
    }
    ordered
}

/// Seasons to scrape: explicit years, or `first_year` through this year.
pub fn pitcher_years(explicit: &[i32], first_year: i32) -> Vec<i32> {
    if !explicit.is_empty() {
        return dedup_years(explicit);
    }
    (first_year..=Utc::now().year()).collect()
}

/// Seasons for the team scrape: explicit years, or this year.
pub fn team_years(explicit: &[i32]) -> Vec<i32> {
    if !explicit.is_empty() {
        return dedup_years(explicit);
    }
    vec![Utc::now().year()]
}

fn dedup_years(years: &[i32]) -> Vec<i32> {
    let mut seen = HashSet::new();
    years.iter().copied().filter(|y| seen.insert(*y)).collect()
}

/// Progress bar over (player, season) jobs.
pub fn job_progress(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_load_player_ids_dedupes_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("players.csv");
        fs::write(&path, "player_id,name\nbbb01,B\naaa01,A\nbbb01,B\n ,X\nccc01,C\n").unwrap();

        assert_eq!(load_player_ids(&path).unwrap(), ids(&["bbb01", "aaa01", "ccc01"]));
    }

    #[test]
    fn test_load_player_ids_legacy_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pitchers.csv");
        fs::write(&path, "Pitcher_ID\ndegroja01\n").unwrap();

        assert_eq!(load_player_ids(&path).unwrap(), ids(&["degroja01"]));
    }

    #[test]
    fn test_load_player_ids_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_player_ids(&dir.path().join("missing.csv")),
            Err(ConfigError::MissingInput(_))
        ));

        let path = dir.path().join("wrong.csv");
        fs::write(&path, "id\naaa01\n").unwrap();
        assert!(matches!(
            load_player_ids(&path),
            Err(ConfigError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_order_players() {
        let existing: HashSet<String> = ["aaa01".to_string()].into_iter().collect();
        let all = ids(&["aaa01", "bbb01", "ccc01"]);

        assert_eq!(
            order_players(all.clone(), &existing, StoredPlayers::Scrape, None),
            ids(&["aaa01", "bbb01", "ccc01"])
        );
        assert_eq!(
            order_players(all.clone(), &existing, StoredPlayers::Last, None),
            ids(&["bbb01", "ccc01", "aaa01"])
        );
        assert_eq!(
            order_players(all.clone(), &existing, StoredPlayers::Last, Some(2)),
            ids(&["bbb01", "ccc01"])
        );
        assert_eq!(
            order_players(all.clone(), &existing, StoredPlayers::Skip, None),
            ids(&["bbb01", "ccc01"])
        );
        assert_eq!(
            order_players(all, &existing, StoredPlayers::Skip, Some(1)),
            ids(&["bbb01"])
        );
    }

    #[test]
    fn test_years() {
        assert_eq!(pitcher_years(&[2023, 2022, 2023], 2021), vec![2023, 2022]);
        let defaults = pitcher_years(&[], 2021);
        assert_eq!(defaults.first(), Some(&2021));
        assert_eq!(defaults.last(), Some(&Utc::now().year()));
        assert_eq!(team_years(&[]), vec![Utc::now().year()]);
    }
}
