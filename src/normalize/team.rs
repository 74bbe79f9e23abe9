//! Team batting row normalization.

use tracing::{debug, trace};

use super::fields::canonicalize_team;
use super::{coerce, linked_team_code, Discard, DiscardCounts};
use crate::models::TeamStatRecord;
use crate::repository::schema::team_stat;
use crate::scrapers::RawRow;

/// Normalize one row of the league team batting table.
pub fn normalize_team_row(raw: &RawRow, year: i32) -> Result<TeamStatRecord, Discard> {
    let team_cell = raw
        .iter()
        .find(|(field, _)| canonicalize_team(field) == "team_id")
        .map(|(_, cell)| cell)
        .ok_or(Discard::MissingTeam)?;

    let name = team_cell.text.trim();
    if name == "Tm" || name == "Team" {
        return Err(Discard::HeaderRow);
    }
    if name.starts_with("League Average") || name.contains("Total") {
        return Err(Discard::SummaryRow);
    }

    let team_id = linked_team_code(team_cell)
        .or_else(|| (!name.is_empty()).then(|| name.to_string()))
        .ok_or(Discard::MissingTeam)?;

    let mut record = TeamStatRecord::new(team_id, year);
    for (field, cell) in raw {
        let column = canonicalize_team(field);
        if column == "team_id" {
            continue;
        }
        match team_stat(&column) {
            Some(col) => {
                record
                    .stats
                    .entry(col.name.to_string())
                    .or_insert_with(|| coerce(col.kind, &cell.text));
            }
            None => trace!("Ignoring unmapped team field '{}'", column),
        }
    }

    Ok(record)
}

/// Normalize a whole team batting table for one season.
pub fn normalize_team_table(rows: &[RawRow], year: i32) -> (Vec<TeamStatRecord>, DiscardCounts) {
    let mut records = Vec::new();
    let mut discarded = DiscardCounts::default();
    for row in rows {
        match normalize_team_row(row, year) {
            Ok(record) => records.push(record),
            Err(reason) => discarded.record(reason),
        }
    }
    if !discarded.is_empty() {
        debug!("Team table {}: discarded {}", year, discarded);
    }
    (records, discarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatValue;
    use crate::scrapers::RawCell;

    fn row(cells: &[(&str, RawCell)]) -> RawRow {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_team_code_from_link() {
        let raw = row(&[
            ("team_name", RawCell::linked("New York Mets", "/teams/NYM/2023.shtml")),
            ("b_runs_per_game", RawCell::text("4.43")),
            ("b_so", RawCell::text("1,301")),
            ("b_batting_avg", RawCell::text(".238")),
            ("b_lob", RawCell::text("1100")),
        ]);
        let record = normalize_team_row(&raw, 2023).unwrap();
        assert_eq!(record.team_id, "NYM");
        assert_eq!(record.year, 2023);
        assert_eq!(record.stat("runs_per_game"), Some(&StatValue::Real(4.43)));
        assert_eq!(record.stat("strikeouts"), Some(&StatValue::Integer(1301)));
        assert_eq!(record.stat("batting_avg"), Some(&StatValue::Real(0.238)));
        assert!(!record.stats.contains_key("b_lob"));
    }

    #[test]
    fn test_plain_text_team() {
        let raw = row(&[("Tm", RawCell::text("ATL")), ("R/G", RawCell::text(""))]);
        let record = normalize_team_row(&raw, 2024).unwrap();
        assert_eq!(record.team_id, "ATL");
        assert_eq!(record.stats.get("runs_per_game"), Some(&None));
    }

    #[test]
    fn test_discarded_rows() {
        let rows = vec![
            row(&[("Tm", RawCell::text("Tm"))]),
            row(&[("Tm", RawCell::text("League Average"))]),
            row(&[("Tm", RawCell::text("Totals"))]),
            row(&[("Tm", RawCell::text(""))]),
            row(&[("R/G", RawCell::text("4.5"))]),
            row(&[("Tm", RawCell::text("SDP"))]),
        ];
        let (records, discarded) = normalize_team_table(&rows, 2023);
        assert_eq!(records.len(), 1);
        assert_eq!(discarded.get(Discard::HeaderRow), 1);
        assert_eq!(discarded.get(Discard::SummaryRow), 2);
        assert_eq!(discarded.get(Discard::MissingTeam), 2);
    }
}
