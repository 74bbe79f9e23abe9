//! Declared column sets for every persisted relation.
//!
//! These lists are the allow-list the merge engine validates against. They
//! must describe the shape produced by the latest migration in
//! [`super::migrations`]; `test_declared_columns_match_migrated_schema` keeps
//! the two in lockstep.

/// Storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Real)
    }
}

/// A column in a declared relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn int(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Integer,
    }
}

const fn real(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Real,
    }
}

const fn text(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Text,
    }
}

pub const GAME_LOG_TABLE: &str = "pitching_gamelogs";
pub const PLAYERS_TABLE: &str = "players";
pub const TEAM_STATS_TABLE: &str = "team_stats";

/// Identity and context columns of `pitching_gamelogs`, excluding `id`.
pub const GAME_LOG_KEY_COLUMNS: &[Column] = &[
    text("player_id"),
    text("date_game"),
    int("year"),
    int("game_num"),
    text("team_id"),
    text("opponent_id"),
    text("game_result"),
    int("road_indicator"),
];

/// Statistic columns of `pitching_gamelogs`.
pub const GAME_LOG_STAT_COLUMNS: &[Column] = &[
    int("career_game_num"),
    int("team_game_num"),
    text("player_game_span"),
    text("player_game_result"),
    int("days_rest"),
    real("innings_pitched"),
    int("hits"),
    int("runs"),
    int("earned_runs"),
    int("walks"),
    int("strikeouts"),
    int("home_runs"),
    int("hit_by_pitch"),
    real("era"),
    real("fip"),
    int("batters_faced"),
    int("pitches"),
    int("strikes"),
    int("strikes_looking"),
    int("strikes_swinging"),
    int("ground_balls"),
    int("fly_balls"),
    int("line_drives"),
    int("pop_ups"),
    int("unknown_batted_balls"),
    int("game_score"),
    int("inherited_runners"),
    int("inherited_score"),
    int("stolen_bases"),
    int("caught_stealing"),
    int("pickoffs"),
    int("at_bats"),
    int("doubles"),
    int("triples"),
    int("intentional_walks"),
    int("grounded_into_double_play"),
    int("sacrifice_flies"),
    int("reached_on_error"),
    real("average_leverage_index"),
    real("win_probability_added"),
    real("clutch_leverage_index"),
    real("run_expectancy_24"),
    real("draftkings_points"),
    real("fanduel_points"),
];

/// Columns of `players`.
pub const PLAYER_COLUMNS: &[Column] = &[
    text("player_id"),
    text("player_name"),
    text("last_updated"),
];

/// Identity columns of `team_stats`, excluding `id`.
pub const TEAM_KEY_COLUMNS: &[Column] = &[text("team_id"), int("year")];

/// Statistic columns of `team_stats`.
pub const TEAM_STAT_COLUMNS: &[Column] = &[
    int("games"),
    real("runs_per_game"),
    int("plate_appearances"),
    int("at_bats"),
    int("runs"),
    int("hits"),
    int("doubles"),
    int("triples"),
    int("home_runs"),
    int("rbi"),
    int("stolen_bases"),
    int("caught_stealing"),
    int("walks"),
    int("strikeouts"),
    real("batting_avg"),
    real("on_base_pct"),
    real("slugging_pct"),
    real("ops"),
    int("ops_plus"),
    int("total_bases"),
    int("gidp"),
    int("hit_by_pitch"),
    int("sacrifice_hits"),
    int("sacrifice_flies"),
    int("intentional_walks"),
];

/// Look up a game-log statistic column.
pub fn game_log_stat(name: &str) -> Option<&'static Column> {
    GAME_LOG_STAT_COLUMNS.iter().find(|c| c.name == name)
}

/// Look up a team statistic column.
pub fn team_stat(name: &str) -> Option<&'static Column> {
    TEAM_STAT_COLUMNS.iter().find(|c| c.name == name)
}

/// Every column a relation is expected to carry after migration.
pub fn required_columns(table: &str) -> Vec<&'static str> {
    let sets: &[&[Column]] = match table {
        GAME_LOG_TABLE => &[GAME_LOG_KEY_COLUMNS, GAME_LOG_STAT_COLUMNS],
        PLAYERS_TABLE => &[PLAYER_COLUMNS],
        TEAM_STATS_TABLE => &[TEAM_KEY_COLUMNS, TEAM_STAT_COLUMNS],
        _ => &[],
    };
    sets.iter().flat_map(|s| s.iter().map(|c| c.name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_column_names_are_unique() {
        for table in [GAME_LOG_TABLE, PLAYERS_TABLE, TEAM_STATS_TABLE] {
            let cols = required_columns(table);
            let unique: HashSet<_> = cols.iter().collect();
            assert_eq!(cols.len(), unique.len(), "duplicate column in {}", table);
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(game_log_stat("era").map(|c| c.kind), Some(ColumnKind::Real));
        assert_eq!(
            game_log_stat("strikeouts").map(|c| c.kind),
            Some(ColumnKind::Integer)
        );
        assert!(game_log_stat("player_id").is_none());
        assert!(team_stat("ops_plus").is_some());
        assert!(!ColumnKind::Text.is_numeric());
    }
}
