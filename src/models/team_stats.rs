//! Season batting totals per team.

use serde::Serialize;

use super::{StatLine, StatValue};

/// One team's batting line for a season, unique on (team, year).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamStatRecord {
    pub team_id: String,
    pub year: i32,
    pub stats: StatLine,
}

impl TeamStatRecord {
    pub fn new(team_id: impl Into<String>, year: i32) -> Self {
        Self {
            team_id: team_id.into(),
            year,
            stats: StatLine::new(),
        }
    }

    pub fn with_stat(mut self, column: &str, value: Option<StatValue>) -> Self {
        self.stats.insert(column.to_string(), value);
        self
    }

    pub fn stat(&self, column: &str) -> Option<&StatValue> {
        self.stats.get(column).and_then(|v| v.as_ref())
    }
}
