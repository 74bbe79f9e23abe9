//! Repository layer for SQLite persistence.
//!
//! A [`Store`] owns the database path and opens a short-lived connection per
//! operation. Writes happen inside a single transaction each; no connection
//! is held across a network fetch.

mod gamelogs;
pub mod migrations;
mod players;
pub mod schema;
mod team_stats;

pub use gamelogs::MergeOutcome;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised by the storage layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("schema migration failed: {0}")]
    Migration(String),

    #[error("column '{column}' is not declared for table '{table}'")]
    UnknownColumn { table: &'static str, column: String },
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Open a connection with the pragmas every operation expects.
pub(crate) fn connect(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_secs(30))?;
    conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
    Ok(conn)
}

/// Convert a `QueryReturnedNoRows` into `None`.
pub(crate) fn to_option<T>(result: rusqlite::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

/// Handle to the pitching database.
#[derive(Debug, Clone)]
pub struct Store {
    db_path: PathBuf,
}

impl Store {
    /// Open (creating if needed) the database at `db_path` and bring it to
    /// the latest schema. With `reset`, every owned table is dropped first.
    pub fn initialize(db_path: &Path, reset: bool) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self {
            db_path: db_path.to_path_buf(),
        };

        let mut conn = store.connect()?;
        if reset {
            warn!("Resetting database at {}", db_path.display());
            migrations::drop_all(&conn)?;
        }

        let applied = migrations::run_migrations(&mut conn)?;
        if !applied.is_empty() {
            info!(
                "Database {} migrated to version {}",
                db_path.display(),
                migrations::latest_version()
            );
        }

        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        connect(&self.db_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_initialize_creates_nested_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("baseball.db");

        let store = Store::initialize(&path, false).unwrap();
        assert!(path.exists());
        assert_eq!(store.db_path(), path.as_path());
    }

    #[test]
    fn test_reset_drops_existing_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("baseball.db");

        let store = Store::initialize(&path, false).unwrap();
        store.touch_player("degroja01", Some("Jacob deGrom")).unwrap();
        assert_eq!(store.list_players().unwrap().len(), 1);

        let store = Store::initialize(&path, true).unwrap();
        assert!(store.list_players().unwrap().is_empty());
    }

    #[test]
    fn test_parse_datetime_falls_back_to_epoch() {
        assert_eq!(parse_datetime("garbage"), DateTime::UNIX_EPOCH);
        assert!(parse_datetime_opt(Some("2024-05-01T12:00:00+00:00".into())).is_some());
        assert!(parse_datetime_opt(None).is_none());
    }
}
