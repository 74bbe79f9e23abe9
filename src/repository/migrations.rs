//! Versioned schema migrations.
//!
//! Applied versions are recorded in `schema_migrations`. Each migration runs
//! in its own transaction together with its bookkeeping row.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::schema::{required_columns, GAME_LOG_TABLE, PLAYERS_TABLE, TEAM_STATS_TABLE};
use super::{RepositoryError, Result};

/// A single forward-only migration.
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
    /// Columns added only where the table does not already have them.
    pub add_columns: &'static [AddColumn],
}

/// A nullable column appended to an existing table.
pub struct AddColumn {
    pub table: &'static str,
    pub column: &'static str,
    pub kind: &'static str,
}

const fn game_column(column: &'static str, kind: &'static str) -> AddColumn {
    AddColumn {
        table: GAME_LOG_TABLE,
        column,
        kind,
    }
}

/// All migrations in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: r#"
            CREATE TABLE IF NOT EXISTS pitching_gamelogs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id TEXT NOT NULL,
                date_game TEXT NOT NULL,
                year INTEGER NOT NULL,
                team_id TEXT,
                opponent_id TEXT,
                game_result TEXT,
                road_indicator INTEGER NOT NULL DEFAULT 0,

                career_game_num INTEGER,
                innings_pitched REAL,
                hits INTEGER,
                runs INTEGER,
                earned_runs INTEGER,
                walks INTEGER,
                strikeouts INTEGER,
                home_runs INTEGER,
                hit_by_pitch INTEGER,
                era REAL,
                fip REAL,
                batters_faced INTEGER,
                pitches INTEGER,
                strikes INTEGER,
                strikes_looking INTEGER,
                strikes_swinging INTEGER,
                ground_balls INTEGER,
                fly_balls INTEGER,
                line_drives INTEGER,
                pop_ups INTEGER,
                unknown_batted_balls INTEGER,
                game_score INTEGER,
                stolen_bases INTEGER,
                caught_stealing INTEGER,
                pickoffs INTEGER,
                at_bats INTEGER,
                doubles INTEGER,
                triples INTEGER,
                intentional_walks INTEGER,
                grounded_into_double_play INTEGER,
                sacrifice_flies INTEGER,
                reached_on_error INTEGER,
                average_leverage_index REAL,
                win_probability_added REAL,
                clutch_leverage_index REAL,
                run_expectancy_24 REAL,

                UNIQUE(player_id, date_game, year)
            );

            CREATE TABLE IF NOT EXISTS players (
                player_id TEXT PRIMARY KEY,
                player_name TEXT,
                last_updated TEXT
            );

            CREATE TABLE IF NOT EXISTS team_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                team_id TEXT NOT NULL,
                year INTEGER NOT NULL,
                games INTEGER,
                runs_per_game REAL,
                plate_appearances INTEGER,
                at_bats INTEGER,
                runs INTEGER,
                hits INTEGER,
                doubles INTEGER,
                triples INTEGER,
                home_runs INTEGER,
                rbi INTEGER,
                stolen_bases INTEGER,
                caught_stealing INTEGER,
                walks INTEGER,
                strikeouts INTEGER,
                batting_avg REAL,
                on_base_pct REAL,
                slugging_pct REAL,
                ops REAL,
                ops_plus INTEGER,
                total_bases INTEGER,
                gidp INTEGER,
                hit_by_pitch INTEGER,
                sacrifice_hits INTEGER,
                sacrifice_flies INTEGER,
                intentional_walks INTEGER,
                UNIQUE(team_id, year)
            );
        "#,
        add_columns: &[],
    },
    Migration {
        version: 2,
        name: "game_context_columns",
        sql: "",
        add_columns: &[
            game_column("game_num", "INTEGER"),
            game_column("team_game_num", "INTEGER"),
            game_column("player_game_span", "TEXT"),
            game_column("player_game_result", "TEXT"),
            game_column("days_rest", "INTEGER"),
            game_column("inherited_runners", "INTEGER"),
            game_column("inherited_score", "INTEGER"),
            game_column("draftkings_points", "REAL"),
            game_column("fanduel_points", "REAL"),
        ],
    },
    Migration {
        version: 3,
        name: "query_indexes",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_pitching_gamelogs_player_year
                ON pitching_gamelogs(player_id, year, date_game);
            CREATE INDEX IF NOT EXISTS idx_team_stats_year
                ON team_stats(year, team_id);
        "#,
        add_columns: &[],
    },
];

/// Latest schema version known to this build.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{}\")", table))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    if !migration.sql.trim().is_empty() {
        conn.execute_batch(migration.sql)?;
    }
    for add in migration.add_columns {
        if table_columns(conn, add.table)?.iter().any(|c| c == add.column) {
            debug!("{}.{} already present", add.table, add.column);
            continue;
        }
        conn.execute_batch(&format!(
            "ALTER TABLE \"{}\" ADD COLUMN \"{}\" {}",
            add.table, add.column, add.kind
        ))?;
    }
    Ok(())
}

/// True when a later migration adds `column` to `table`.
fn added_later(table: &str, column: &str) -> bool {
    MIGRATIONS
        .iter()
        .flat_map(|m| m.add_columns)
        .any(|add| add.table == table && add.column == column)
}

/// Version the given legacy table set corresponds to, or an error naming the
/// missing columns. Only called for databases without `schema_migrations`.
fn adopt_legacy(conn: &Connection) -> Result<Option<i64>> {
    let mut any_present = false;
    let mut adopted = 1;

    for table in [GAME_LOG_TABLE, PLAYERS_TABLE, TEAM_STATS_TABLE] {
        if !table_exists(conn, table)? {
            continue;
        }
        any_present = true;

        let present = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns(table)
            .into_iter()
            .filter(|c| !present.iter().any(|p| p == c))
            .collect();

        let fatal: Vec<&str> = missing
            .iter()
            .copied()
            .filter(|c| !added_later(table, c))
            .collect();

        if !fatal.is_empty() {
            return Err(RepositoryError::Migration(format!(
                "table '{}' is missing columns [{}]; rerun with --reset-db to recreate it",
                table,
                fatal.join(", ")
            )));
        }
        if table == GAME_LOG_TABLE && missing.is_empty() {
            adopted = 2;
        }
    }

    Ok(any_present.then_some(adopted))
}

/// Apply every pending migration. Returns the versions applied.
pub fn run_migrations(conn: &mut Connection) -> Result<Vec<i64>> {
    let tracked = table_exists(conn, "schema_migrations")?;
    let legacy_version = if tracked { None } else { adopt_legacy(conn)? };

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        );
        "#,
    )?;

    if let Some(baseline) = legacy_version {
        info!("Adopting existing tables as schema version {}", baseline);
        // Fill in any relation the legacy database never created.
        conn.execute_batch(MIGRATIONS[0].sql)?;
        let now = Utc::now().to_rfc3339();
        for migration in MIGRATIONS.iter().filter(|m| m.version <= baseline) {
            conn.execute(
                "INSERT OR IGNORE INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
                params![migration.version, migration.name, now],
            )?;
        }
    }

    let current: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > latest_version() {
        return Err(RepositoryError::Migration(format!(
            "database schema version {} is newer than this build supports ({})",
            current,
            latest_version()
        )));
    }

    let mut applied = Vec::new();
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = conn.transaction()?;
        apply(&tx, migration)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        info!("Applied migration {:04}_{}", migration.version, migration.name);
        applied.push(migration.version);
    }

    if applied.is_empty() {
        debug!("No pending migrations");
    }

    Ok(applied)
}

/// Drop every relation this crate owns.
pub fn drop_all(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DROP TABLE IF EXISTS pitching_gamelogs;
        DROP TABLE IF EXISTS players;
        DROP TABLE IF EXISTS team_stats;
        DROP TABLE IF EXISTS schema_migrations;
        "#,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_columns_match_migrated_schema() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();

        for table in [GAME_LOG_TABLE, PLAYERS_TABLE, TEAM_STATS_TABLE] {
            let mut present = table_columns(&conn, table).unwrap();
            present.retain(|c| c != "id");
            present.sort();

            let mut declared: Vec<String> = required_columns(table)
                .into_iter()
                .map(String::from)
                .collect();
            declared.sort();

            assert_eq!(present, declared, "schema drift in {}", table);
        }
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(run_migrations(&mut conn).unwrap(), vec![1, 2, 3]);
        assert!(run_migrations(&mut conn).unwrap().is_empty());
    }

    #[test]
    fn test_legacy_schema_missing_columns_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE pitching_gamelogs (id INTEGER PRIMARY KEY, player_id TEXT, year INTEGER);",
        )
        .unwrap();

        let err = run_migrations(&mut conn).unwrap_err();
        match err {
            RepositoryError::Migration(msg) => {
                assert!(msg.contains("date_game"));
                assert!(msg.contains("--reset-db"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_legacy_schema_without_later_columns_is_upgraded() {
        let mut conn = Connection::open_in_memory().unwrap();
        // Shape of a database written before version tracking existed.
        let v1 = MIGRATIONS[0].sql;
        conn.execute_batch(v1).unwrap();
        conn.execute(
            "INSERT INTO players (player_id, player_name, last_updated) VALUES ('degroja01', 'Jacob deGrom', '2024-01-01T00:00:00+00:00')",
            [],
        )
        .unwrap();

        let applied = run_migrations(&mut conn).unwrap();
        assert_eq!(applied, vec![2, 3]);

        let columns = table_columns(&conn, GAME_LOG_TABLE).unwrap();
        for column in ["game_num", "days_rest", "inherited_score", "draftkings_points"] {
            assert!(columns.iter().any(|c| c == column), "missing {}", column);
        }

        let name: String = conn
            .query_row(
                "SELECT player_name FROM players WHERE player_id = 'degroja01'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(name, "Jacob deGrom");
    }

    #[test]
    fn test_legacy_schema_with_some_later_columns_is_completed() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0].sql).unwrap();
        conn.execute_batch(
            "ALTER TABLE pitching_gamelogs ADD COLUMN game_num INTEGER;
             ALTER TABLE pitching_gamelogs ADD COLUMN days_rest INTEGER;",
        )
        .unwrap();

        assert_eq!(run_migrations(&mut conn).unwrap(), vec![2, 3]);

        let mut present = table_columns(&conn, GAME_LOG_TABLE).unwrap();
        present.retain(|c| c != "id");
        assert_eq!(present.len(), required_columns(GAME_LOG_TABLE).len());
    }
}
