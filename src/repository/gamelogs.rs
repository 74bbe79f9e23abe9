//! Game-log merge engine and read-side queries.

use std::collections::{BTreeSet, HashSet};

use chrono::{NaiveDate, Utc};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, Row};
use tracing::{debug, warn};

use super::schema::{self, Column, GAME_LOG_STAT_COLUMNS, GAME_LOG_TABLE};
use super::{players, RepositoryError, Result, Store};
use crate::models::{GameLogRecord, PlayerSummary, StatLine, StatValue};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// What a single merge did to storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Rows written.
    pub inserted: usize,
    /// Previously stored rows replaced for the covered seasons.
    pub replaced: usize,
    /// Batch rows dropped because their key was already seen.
    pub duplicates: usize,
    /// Batch rows dropped because they belong to another player.
    pub foreign: usize,
    /// Undeclared columns removed from the batch.
    pub unknown_columns: Vec<String>,
}

/// Resolve a statistic column against the declared set.
fn validate_stat_column(name: &str) -> Result<&'static Column> {
    schema::game_log_stat(name).ok_or_else(|| RepositoryError::UnknownColumn {
        table: GAME_LOG_TABLE,
        column: name.to_string(),
    })
}

fn stat_to_sql(value: Option<&StatValue>) -> Value {
    match value {
        None => Value::Null,
        Some(StatValue::Integer(v)) => Value::Integer(*v),
        Some(StatValue::Real(v)) => Value::Real(*v),
        Some(StatValue::Text(s)) => Value::Text(s.clone()),
    }
}

fn stat_from_sql(value: ValueRef<'_>) -> Option<StatValue> {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Integer(v) => Some(StatValue::Integer(v)),
        ValueRef::Real(v) => Some(StatValue::Real(v)),
        ValueRef::Text(t) => Some(StatValue::Text(String::from_utf8_lossy(t).into_owned())),
    }
}

fn insert_sql() -> String {
    let mut columns: Vec<&str> = vec![
        "player_id",
        "date_game",
        "year",
        "game_num",
        "team_id",
        "opponent_id",
        "game_result",
        "road_indicator",
    ];
    columns.extend(GAME_LOG_STAT_COLUMNS.iter().map(|c| c.name));

    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        GAME_LOG_TABLE,
        columns.join(", "),
        placeholders.join(", ")
    )
}

fn record_params(record: &GameLogRecord) -> Vec<Value> {
    let mut values = vec![
        Value::Text(record.player_id.clone()),
        Value::Text(record.game_date.format(DATE_FORMAT).to_string()),
        Value::Integer(record.year as i64),
        record.game_num.map(Value::Integer).unwrap_or(Value::Null),
        record.team_id.clone().map(Value::Text).unwrap_or(Value::Null),
        record.opponent_id.clone().map(Value::Text).unwrap_or(Value::Null),
        record.game_result.clone().map(Value::Text).unwrap_or(Value::Null),
        Value::Integer(record.road_indicator as i64),
    ];
    values.extend(
        GAME_LOG_STAT_COLUMNS
            .iter()
            .map(|c| stat_to_sql(record.stat(c.name))),
    );
    values
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<GameLogRecord> {
    let date_text: String = row.get("date_game")?;
    let game_date = NaiveDate::parse_from_str(&date_text, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })?;

    let mut stats = StatLine::new();
    for column in GAME_LOG_STAT_COLUMNS {
        stats.insert(column.name.to_string(), stat_from_sql(row.get_ref(column.name)?));
    }

    Ok(GameLogRecord {
        player_id: row.get("player_id")?,
        game_date,
        year: row.get("year")?,
        game_num: row.get("game_num")?,
        team_id: row.get("team_id")?,
        opponent_id: row.get("opponent_id")?,
        game_result: row.get("game_result")?,
        road_indicator: row.get::<_, Option<i64>>("road_indicator")?.unwrap_or(0) != 0,
        stats,
    })
}

/// Convert the site's innings notation (6.1 = six and one third) to outs.
pub(crate) fn innings_to_outs(innings: f64) -> i64 {
    let whole = innings.trunc();
    let partial = ((innings - whole) * 10.0).round() as i64;
    whole as i64 * 3 + partial
}

/// Convert outs back to innings notation.
pub(crate) fn outs_to_innings(outs: i64) -> f64 {
    (outs / 3) as f64 + (outs % 3) as f64 / 10.0
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

impl Store {
    /// Replace a player's stored games for the covered seasons with `records`.
    ///
    /// `seasons` lists every season that was fetched successfully, including
    /// ones that returned no games; seasons of the records themselves are
    /// always covered too. Stored rows for other seasons are left untouched.
    /// The delete, insert and identity upsert happen in one transaction.
    pub fn merge_game_logs(
        &self,
        player_id: &str,
        seasons: &[i32],
        records: &[GameLogRecord],
        display_name: Option<&str>,
    ) -> Result<MergeOutcome> {
        let mut outcome = MergeOutcome::default();

        // Allow-list validation of every statistic column in the batch.
        let mut unknown: BTreeSet<String> = BTreeSet::new();
        for record in records {
            for column in record.stats.keys() {
                if let Err(e) = validate_stat_column(column) {
                    if unknown.insert(column.clone()) {
                        warn!("Dropping column from {} batch: {}", player_id, e);
                    }
                }
            }
        }
        outcome.unknown_columns = unknown.into_iter().collect();

        let mut seen: HashSet<(NaiveDate, i32)> = HashSet::new();
        let mut batch: Vec<&GameLogRecord> = Vec::with_capacity(records.len());
        for record in records {
            if record.player_id != player_id {
                outcome.foreign += 1;
                continue;
            }
            if seen.insert((record.game_date, record.year)) {
                batch.push(record);
            } else {
                outcome.duplicates += 1;
            }
        }
        if outcome.foreign > 0 {
            warn!(
                "Dropped {} rows belonging to other players from {} batch",
                outcome.foreign, player_id
            );
        }
        if outcome.duplicates > 0 {
            debug!(
                "Dropped {} duplicate game dates from {} batch",
                outcome.duplicates, player_id
            );
        }

        let covered: BTreeSet<i32> = seasons
            .iter()
            .copied()
            .chain(batch.iter().map(|r| r.year))
            .collect();

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        for year in &covered {
            outcome.replaced += tx.execute(
                "DELETE FROM pitching_gamelogs WHERE player_id = ?1 AND year = ?2",
                params![player_id, year],
            )?;
        }

        {
            let mut stmt = tx.prepare(&insert_sql())?;
            for record in &batch {
                stmt.execute(params_from_iter(record_params(record)))?;
                outcome.inserted += 1;
            }
        }

        players::upsert_player(&tx, player_id, display_name, Utc::now())?;

        tx.commit()?;

        debug!(
            "Merged {} games for {} across seasons {:?} (replaced {})",
            outcome.inserted, player_id, covered, outcome.replaced
        );
        Ok(outcome)
    }

    /// All stored games for one player, ordered by season then date.
    pub fn get_by_player(&self, player_id: &str) -> Result<Vec<GameLogRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM pitching_gamelogs WHERE player_id = ?1 ORDER BY year, date_game",
        )?;
        let records = stmt
            .query_map(params![player_id], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Every stored game, ordered by player, season, date.
    pub fn get_all(&self) -> Result<Vec<GameLogRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT * FROM pitching_gamelogs ORDER BY player_id, year, date_game")?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Career aggregate for one player, or `None` when nothing is stored.
    pub fn get_summary(&self, player_id: &str) -> Result<Option<PlayerSummary>> {
        let conn = self.connect()?;
        summary_query(&conn, player_id)
    }

    /// Number of stored games for one player.
    pub fn game_count(&self, player_id: &str) -> Result<i64> {
        let conn = self.connect()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM pitching_gamelogs WHERE player_id = ?1",
            params![player_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn summary_query(conn: &Connection, player_id: &str) -> Result<Option<PlayerSummary>> {
    let (games, strikeouts, avg_k, walks, hits, earned_runs, avg_era): (
        i64,
        Option<i64>,
        Option<f64>,
        Option<i64>,
        Option<i64>,
        Option<i64>,
        Option<f64>,
    ) = conn.query_row(
        r#"
        SELECT
            COUNT(*),
            SUM(strikeouts),
            AVG(strikeouts),
            SUM(walks),
            SUM(hits),
            SUM(earned_runs),
            AVG(era)
        FROM pitching_gamelogs WHERE player_id = ?1
        "#,
        params![player_id],
        |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        },
    )?;

    if games == 0 {
        return Ok(None);
    }

    // Innings are summed as outs so partial innings carry correctly.
    let mut stmt = conn.prepare(
        "SELECT innings_pitched FROM pitching_gamelogs WHERE player_id = ?1 AND innings_pitched IS NOT NULL",
    )?;
    let innings: Vec<f64> = stmt
        .query_map(params![player_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let total_innings = if innings.is_empty() {
        None
    } else {
        Some(outs_to_innings(innings.into_iter().map(innings_to_outs).sum()))
    };

    Ok(Some(PlayerSummary {
        player_id: player_id.to_string(),
        games,
        total_innings,
        total_strikeouts: strikeouts,
        avg_strikeouts_per_game: avg_k.map(|v| round_to(v, 1)),
        total_walks: walks,
        total_hits: hits,
        total_earned_runs: earned_runs,
        avg_era: avg_era.map(|v| round_to(v, 2)),
    }))
}
