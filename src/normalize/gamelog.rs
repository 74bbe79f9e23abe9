//! Game-log row normalization.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, trace};

use super::fields::canonicalize;
use super::{coerce, team_code, Discard, DiscardCounts};
use crate::models::GameLogRecord;
use crate::repository::schema::{game_log_stat, ColumnKind};
use crate::scrapers::{RawCell, RawRow};

/// Box-score links carry the date as `YYYYMMDD` (or `YYYY-MM-DD`).
static LINK_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})-?(\d{2})-?(\d{2})").unwrap());

/// Doubleheader suffix on display dates, e.g. "Jul 4(2)".
static GAME_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\(\d+\)\s*$").unwrap());

/// Recover a game date: the link target first, then the display text, which
/// is either ISO or a month-day that takes its year from `season`.
pub fn parse_game_date(cell: &RawCell, season: i32) -> Option<NaiveDate> {
    if let Some(href) = cell.link.as_deref() {
        let from_link = LINK_DATE.captures(href).and_then(|caps| {
            NaiveDate::from_ymd_opt(
                caps[1].parse().ok()?,
                caps[2].parse().ok()?,
                caps[3].parse().ok()?,
            )
        });
        if from_link.is_some() {
            return from_link;
        }
    }

    let text = GAME_SUFFIX.replace(cell.text.trim(), "");
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{} {}", text, season), "%b %d %Y"))
        .or_else(|_| NaiveDate::parse_from_str(text, "%b %d, %Y"))
        .ok()
}

fn is_header_label(canonical: &BTreeMap<Cow<'_, str>, &RawCell>) -> bool {
    let label = |column: &str, value: &str| {
        canonical
            .get(column)
            .map(|c| c.text.trim() == value)
            .unwrap_or(false)
    };
    label("team_id", "Tm")
        || label("opponent_id", "Opp")
        || label("game_num", "Rk")
        || label("date_game", "Date")
}

/// Normalize one game-log row for `player_id` in `season`.
pub fn normalize_game_log(
    raw: &RawRow,
    player_id: &str,
    season: i32,
) -> Result<GameLogRecord, Discard> {
    let player_id = player_id.trim();
    if player_id.is_empty() {
        return Err(Discard::MissingEntity);
    }

    let mut canonical: BTreeMap<Cow<'_, str>, &RawCell> = BTreeMap::new();
    for (field, cell) in raw {
        canonical.entry(canonicalize(field)).or_insert(cell);
    }

    if is_header_label(&canonical) {
        return Err(Discard::HeaderRow);
    }

    let game_date = canonical
        .get("date_game")
        .and_then(|cell| parse_game_date(cell, season))
        .ok_or(Discard::MissingDate)?;

    let mut record = GameLogRecord::new(player_id, game_date, season);

    for (column, cell) in &canonical {
        match column.as_ref() {
            "date_game" => {}
            "game_num" => {
                record.game_num = coerce(ColumnKind::Integer, &cell.text).and_then(|v| v.as_i64())
            }
            "team_id" => record.team_id = team_code(cell),
            "opponent_id" => record.opponent_id = team_code(cell),
            "game_result" => {
                let text = cell.text.trim();
                record.game_result = (!text.is_empty()).then(|| text.to_string());
            }
            "road_indicator" => record.road_indicator = cell.text.contains('@'),
            name => match game_log_stat(name) {
                Some(col) => {
                    record.stats.insert(col.name.to_string(), coerce(col.kind, &cell.text));
                }
                None => trace!("Ignoring unmapped field '{}'", name),
            },
        }
    }

    Ok(record)
}

/// A season's normalized records and what was dropped on the way.
#[derive(Debug, Clone, Default)]
pub struct NormalizedSeason {
    pub records: Vec<GameLogRecord>,
    pub discarded: DiscardCounts,
}

/// True when every record carries a rank and the ranks strictly increase.
fn has_usable_ranks(records: &[GameLogRecord]) -> bool {
    let mut previous = None;
    for record in records {
        match (previous, record.game_num) {
            (_, None) => return false,
            (Some(prev), Some(rank)) if rank <= prev => return false,
            (_, rank) => previous = rank,
        }
    }
    true
}

/// Normalize every row of one player's season table.
///
/// Records keep table order. `game_num` is the site's rank when that rank
/// strictly increases down the table, and the 1-based position among
/// surviving rows otherwise.
pub fn normalize_season(rows: &[RawRow], player_id: &str, season: i32) -> NormalizedSeason {
    let mut out = NormalizedSeason::default();
    for row in rows {
        match normalize_game_log(row, player_id, season) {
            Ok(record) => out.records.push(record),
            Err(reason) => out.discarded.record(reason),
        }
    }

    if !has_usable_ranks(&out.records) {
        trace!("Numbering {} {} games by position", player_id, season);
        for (position, record) in out.records.iter_mut().enumerate() {
            record.game_num = Some(position as i64 + 1);
        }
    }

    if out.discarded.get(Discard::MissingDate) > 0 {
        debug!(
            "Discarded {} rows without a game date for {} {}",
            out.discarded.get(Discard::MissingDate),
            player_id,
            season
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatValue;

    fn row(cells: &[(&str, RawCell)]) -> RawRow {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_date_from_link_wins() {
        let cell = RawCell::linked("Apr 17", "/boxes/NYN/NYN202304160.shtml");
        assert_eq!(
            parse_game_date(&cell, 2023),
            NaiveDate::from_ymd_opt(2023, 4, 16)
        );
    }

    #[test]
    fn test_date_from_text() {
        assert_eq!(
            parse_game_date(&RawCell::text("Apr 6"), 2023),
            NaiveDate::from_ymd_opt(2023, 4, 6)
        );
        assert_eq!(
            parse_game_date(&RawCell::text("Jul 4(2)"), 2022),
            NaiveDate::from_ymd_opt(2022, 7, 4)
        );
        assert_eq!(
            parse_game_date(&RawCell::text("2021-09-30"), 2021),
            NaiveDate::from_ymd_opt(2021, 9, 30)
        );
        assert_eq!(parse_game_date(&RawCell::text(""), 2023), None);
        assert_eq!(parse_game_date(&RawCell::text("Totals"), 2023), None);
    }

    #[test]
    fn test_normalizes_typed_record() {
        let raw = row(&[
            ("ranker", RawCell::text("3")),
            ("date_game", RawCell::linked("Apr 16", "/boxes/NYN/NYN202304160.shtml")),
            ("team_ID", RawCell::linked("NYM", "/teams/NYM/2023.shtml")),
            ("team_homeORaway", RawCell::text("@")),
            ("opp_ID", RawCell::text("ATL")),
            ("game_result", RawCell::text("W 5-3")),
            ("IP", RawCell::text("6.1")),
            ("SO", RawCell::text("")),
            ("earned_run_avg", RawCell::text("2.57")),
            ("pitcher_situation_in", RawCell::text("1t 0 ---")),
        ]);

        let record = normalize_game_log(&raw, "doej01", 2023).unwrap();
        assert_eq!(record.game_num, Some(3));
        assert_eq!(record.team_id.as_deref(), Some("NYM"));
        assert_eq!(record.opponent_id.as_deref(), Some("ATL"));
        assert_eq!(record.game_result.as_deref(), Some("W 5-3"));
        assert!(record.road_indicator);
        assert_eq!(record.stat("innings_pitched"), Some(&StatValue::Real(6.1)));
        assert_eq!(record.stats.get("strikeouts"), Some(&None));
        assert_eq!(record.stat_f64("era"), Some(2.57));
        assert!(!record.stats.contains_key("pitcher_situation_in"));
    }

    #[test]
    fn test_home_when_marker_absent() {
        let raw = row(&[
            ("date_game", RawCell::text("Apr 16")),
            ("team_homeORaway", RawCell::text("  ")),
        ]);
        assert!(!normalize_game_log(&raw, "doej01", 2023).unwrap().road_indicator);

        let raw = row(&[("date_game", RawCell::text("Apr 16"))]);
        assert!(!normalize_game_log(&raw, "doej01", 2023).unwrap().road_indicator);
    }

    #[test]
    fn test_discards() {
        let header = row(&[
            ("date_game", RawCell::text("Apr 16")),
            ("team_ID", RawCell::text("Tm")),
        ]);
        assert_eq!(
            normalize_game_log(&header, "doej01", 2023),
            Err(Discard::HeaderRow)
        );

        let undated = row(&[("SO", RawCell::text("5"))]);
        assert_eq!(
            normalize_game_log(&undated, "doej01", 2023),
            Err(Discard::MissingDate)
        );

        let dated = row(&[("date_game", RawCell::text("Apr 16"))]);
        assert_eq!(
            normalize_game_log(&dated, " ", 2023),
            Err(Discard::MissingEntity)
        );
    }

    #[test]
    fn test_normalize_season_counts() {
        let rows = vec![
            row(&[("date_game", RawCell::text("Apr 1"))]),
            row(&[("date_game", RawCell::text(""))]),
            row(&[("Rk", RawCell::text("Rk")), ("Date", RawCell::text("Date"))]),
        ];
        let season = normalize_season(&rows, "doej01", 2023);
        assert_eq!(season.records.len(), 1);
        assert_eq!(season.discarded.get(Discard::MissingDate), 1);
        assert_eq!(season.discarded.get(Discard::HeaderRow), 1);
    }

    fn game_nums(season: &NormalizedSeason) -> Vec<Option<i64>> {
        season.records.iter().map(|r| r.game_num).collect()
    }

    #[test]
    fn test_sequence_without_rank_column() {
        let markup = r#"
            <table id="pitching_gamelogs">
              <thead><tr><th>Date</th><th>Opp</th><th>SO</th></tr></thead>
              <tbody>
                <tr><td>Apr 1</td><td>MIA</td><td>7</td></tr>
                <tr><td></td><td>ATL</td><td>4</td></tr>
                <tr><td>Apr 7</td><td>ATL</td><td>5</td></tr>
              </tbody>
            </table>
        "#;
        let rows = crate::scrapers::extract_table(markup, "pitching_gamelogs").unwrap();
        let season = normalize_season(&rows, "doej01", 2023);

        assert_eq!(game_nums(&season), vec![Some(1), Some(2)]);
        assert_eq!(season.records[1].stat_i64("strikeouts"), Some(5));
    }

    #[test]
    fn test_site_rank_kept_when_increasing() {
        let rows = vec![
            row(&[("ranker", RawCell::text("1")), ("date_game", RawCell::text("Apr 1"))]),
            row(&[("ranker", RawCell::text("2")), ("date_game", RawCell::text(""))]),
            row(&[("ranker", RawCell::text("3")), ("date_game", RawCell::text("Apr 9"))]),
        ];
        let season = normalize_season(&rows, "doej01", 2023);
        assert_eq!(game_nums(&season), vec![Some(1), Some(3)]);
    }

    #[test]
    fn test_unordered_ranks_are_renumbered() {
        let rows = vec![
            row(&[("ranker", RawCell::text("4")), ("date_game", RawCell::text("Apr 1"))]),
            row(&[("ranker", RawCell::text("x")), ("date_game", RawCell::text("Apr 5"))]),
            row(&[("ranker", RawCell::text("2")), ("date_game", RawCell::text("Apr 9"))]),
        ];
        let season = normalize_season(&rows, "doej01", 2023);
        let nums = game_nums(&season);
        assert_eq!(nums, vec![Some(1), Some(2), Some(3)]);
        assert!(nums.windows(2).all(|w| w[0] < w[1]));
    }
}
