//! Per-game pitching records.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

/// A typed statistic value. Absent values are `None` in a [`StatLine`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl StatValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Real(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for StatValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Real(v) => write!(f, "{}", v),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Canonical column name to value. `None` means the source did not supply
/// a usable value; it is never replaced with zero.
pub type StatLine = BTreeMap<String, Option<StatValue>>;

/// One pitching appearance, unique on (player, date, season).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameLogRecord {
    pub player_id: String,
    pub game_date: NaiveDate,
    pub year: i32,
    /// Row rank within the season's game log.
    pub game_num: Option<i64>,
    pub team_id: Option<String>,
    pub opponent_id: Option<String>,
    pub game_result: Option<String>,
    /// True for road games.
    pub road_indicator: bool,
    pub stats: StatLine,
}

impl GameLogRecord {
    pub fn new(player_id: impl Into<String>, game_date: NaiveDate, year: i32) -> Self {
        Self {
            player_id: player_id.into(),
            game_date,
            year,
            game_num: None,
            team_id: None,
            opponent_id: None,
            game_result: None,
            road_indicator: false,
            stats: StatLine::new(),
        }
    }

    /// Natural key used for de-duplication and the storage constraint.
    pub fn key(&self) -> (&str, NaiveDate, i32) {
        (&self.player_id, self.game_date, self.year)
    }

    /// Set a statistic, builder style.
    pub fn with_stat(mut self, column: &str, value: Option<StatValue>) -> Self {
        self.stats.insert(column.to_string(), value);
        self
    }

    pub fn stat(&self, column: &str) -> Option<&StatValue> {
        self.stats.get(column).and_then(|v| v.as_ref())
    }

    pub fn stat_i64(&self, column: &str) -> Option<i64> {
        self.stat(column).and_then(StatValue::as_i64)
    }

    pub fn stat_f64(&self, column: &str) -> Option<f64> {
        self.stat(column).and_then(StatValue::as_f64)
    }
}
