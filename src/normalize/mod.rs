//! Row normalization: raw table cells to typed records.
//!
//! Normalizers are pure functions of a [`RawRow`] plus the static mapping
//! tables. Rows that cannot be keyed are returned as a [`Discard`] and
//! counted, never stored.

pub mod fields;
mod gamelog;
mod team;

pub use gamelog::{normalize_game_log, normalize_season, parse_game_date, NormalizedSeason};
pub use team::{normalize_team_row, normalize_team_table};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::models::StatValue;
use crate::repository::schema::ColumnKind;
use crate::scrapers::RawCell;

static TEAM_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/teams/([A-Z0-9]+)/").unwrap());

/// Why a raw row was left out of a normalized batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Error)]
pub enum Discard {
    #[error("repeated header row")]
    HeaderRow,
    #[error("no recoverable game date")]
    MissingDate,
    #[error("no entity identifier")]
    MissingEntity,
    #[error("no team identifier")]
    MissingTeam,
    #[error("summary or league-average row")]
    SummaryRow,
}

/// Per-reason counts of discarded rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscardCounts(BTreeMap<Discard, usize>);

impl DiscardCounts {
    pub fn record(&mut self, reason: Discard) {
        *self.0.entry(reason).or_insert(0) += 1;
    }

    pub fn get(&self, reason: Discard) -> usize {
        self.0.get(&reason).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Add another set of counts into this one.
    pub fn absorb(&mut self, other: &DiscardCounts) {
        for (reason, count) in &other.0 {
            *self.0.entry(*reason).or_insert(0) += count;
        }
    }
}

impl fmt::Display for DiscardCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(reason, count)| format!("{} {}", count, reason))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

/// Parse a cell into a value of the column's kind. Blank or unparseable
/// numeric cells become `None`, never zero.
pub fn coerce(kind: ColumnKind, raw: &str) -> Option<StatValue> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    match kind {
        ColumnKind::Text => Some(StatValue::Text(text.to_string())),
        ColumnKind::Integer => {
            let cleaned = text.replace(',', "");
            if let Ok(v) = cleaned.parse::<i64>() {
                return Some(StatValue::Integer(v));
            }
            match cleaned.parse::<f64>() {
                Ok(v) if v.is_finite() && v.fract() == 0.0 => Some(StatValue::Integer(v as i64)),
                _ => {
                    debug!("Could not coerce '{}' to an integer", text);
                    None
                }
            }
        }
        ColumnKind::Real => match text.replace(',', "").parse::<f64>() {
            Ok(v) if v.is_finite() => Some(StatValue::Real(v)),
            _ => {
                debug!("Could not coerce '{}' to a number", text);
                None
            }
        },
    }
}

/// Short team code from a team cell: display text, else the code embedded in
/// a `/teams/XXX/` link. The literal "none" means no team.
pub fn team_code(cell: &RawCell) -> Option<String> {
    let text = cell.text.trim();
    if !text.is_empty() && !text.eq_ignore_ascii_case("none") {
        return Some(text.to_string());
    }
    linked_team_code(cell)
}

/// Team code embedded in a cell's link, if any.
pub(crate) fn linked_team_code(cell: &RawCell) -> Option<String> {
    cell.link
        .as_deref()
        .and_then(|href| TEAM_LINK.captures(href))
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_is_null_not_zero() {
        assert_eq!(coerce(ColumnKind::Integer, ""), None);
        assert_eq!(coerce(ColumnKind::Integer, "   "), None);
        assert_eq!(coerce(ColumnKind::Real, ""), None);
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(coerce(ColumnKind::Integer, "7"), Some(StatValue::Integer(7)));
        assert_eq!(coerce(ColumnKind::Integer, "1,024"), Some(StatValue::Integer(1024)));
        assert_eq!(coerce(ColumnKind::Integer, "3.0"), Some(StatValue::Integer(3)));
        assert_eq!(coerce(ColumnKind::Integer, "3.5"), None);
        assert_eq!(coerce(ColumnKind::Integer, "abc"), None);
        assert_eq!(coerce(ColumnKind::Real, ".238"), Some(StatValue::Real(0.238)));
        assert_eq!(coerce(ColumnKind::Real, "inf"), None);
        assert_eq!(
            coerce(ColumnKind::Text, " W 5-3 "),
            Some(StatValue::Text("W 5-3".into()))
        );
    }

    #[test]
    fn test_team_code() {
        assert_eq!(team_code(&RawCell::text("NYM")), Some("NYM".into()));
        assert_eq!(team_code(&RawCell::text("none")), None);
        assert_eq!(team_code(&RawCell::text("")), None);
        assert_eq!(
            team_code(&RawCell::linked("", "/teams/ATL/2023.shtml")),
            Some("ATL".into())
        );
    }

    #[test]
    fn test_discard_counts() {
        let mut counts = DiscardCounts::default();
        counts.record(Discard::MissingDate);
        counts.record(Discard::MissingDate);
        counts.record(Discard::HeaderRow);
        assert_eq!(counts.get(Discard::MissingDate), 2);
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.to_string(), "1 repeated header row, 2 no recoverable game date");

        let mut total = DiscardCounts::default();
        total.absorb(&counts);
        total.absorb(&counts);
        assert_eq!(total.get(Discard::MissingDate), 4);
        assert_eq!(total.total(), 6);
    }
}
