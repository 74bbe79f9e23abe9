//! Source field name to canonical column name.
//!
//! Both the site's `data-stat` attribute names and its visible header labels
//! are mapped, since tables without `data-stat` attributes fall back to
//! header text. Unmapped names pass through unchanged and are rejected later
//! by the store's allow-list.

use std::borrow::Cow;

/// Canonical name for a pitching game-log field.
pub fn canonicalize(raw: &str) -> Cow<'_, str> {
    match game_log_alias(raw) {
        Some(name) => Cow::Borrowed(name),
        None => Cow::Borrowed(raw),
    }
}

/// Canonical name for a team batting field.
pub fn canonicalize_team(raw: &str) -> Cow<'_, str> {
    match team_alias(raw) {
        Some(name) => Cow::Borrowed(name),
        None => Cow::Borrowed(raw),
    }
}

fn game_log_alias(raw: &str) -> Option<&'static str> {
    let name = match raw {
        // Identity and context
        "ranker" | "Rk" => "game_num",
        "career_game_num" | "player_game_num_career" | "Gcar" => "career_game_num",
        "team_game_num" | "team_game_num_season" | "Gtm" => "team_game_num",
        "date_game" | "date" | "Date" => "date_game",
        "team_ID" | "team_name_abbr" | "Tm" | "Team" => "team_id",
        "team_homeORaway" | "game_location" | "@" => "road_indicator",
        "opp_ID" | "opp_name_abbr" | "Opp" => "opponent_id",
        "game_result" | "Rslt" => "game_result",
        "player_game_span" | "Inngs" => "player_game_span",
        "player_game_result" | "Dec" => "player_game_result",
        "days_rest" | "DR" => "days_rest",

        // Counting stats
        "IP" | "p_ip" => "innings_pitched",
        "H" | "p_h" => "hits",
        "R" | "p_r" => "runs",
        "ER" | "p_er" => "earned_runs",
        "BB" | "p_bb" => "walks",
        "SO" | "p_so" => "strikeouts",
        "HR" | "p_hr" => "home_runs",
        "HBP" | "p_hbp" => "hit_by_pitch",
        "earned_run_avg" | "p_earned_run_avg" | "ERA" => "era",
        "fip" | "p_fip" | "FIP" => "fip",
        "batters_faced" | "p_bfp" | "BF" => "batters_faced",
        "pitches" | "p_pitches" | "Pit" => "pitches",
        "strikes_total" | "p_strikes_total" | "Str" => "strikes",
        "strikes_looking" | "p_strikes_looking" | "StL" => "strikes_looking",
        "strikes_swinging" | "p_strikes_swinging" | "StS" => "strikes_swinging",
        "inplay_gb_total" | "p_inplay_gb_total" | "GB" => "ground_balls",
        "inplay_fb_total" | "p_inplay_fb_total" | "FB" => "fly_balls",
        "inplay_ld" | "p_inplay_ld" | "LD" => "line_drives",
        "inplay_pu" | "p_inplay_pu" | "PU" => "pop_ups",
        "inplay_unk" | "p_inplay_unk" | "Unk" => "unknown_batted_balls",
        "game_score" | "p_game_score" | "GSc" => "game_score",
        "inherited_runners" | "p_inherited_runners" | "IR" => "inherited_runners",
        "inherited_score" | "p_inherited_score" | "IS" => "inherited_score",
        "SB" | "p_sb" => "stolen_bases",
        "CS" | "p_cs" => "caught_stealing",
        "pickoffs" | "p_pickoffs" | "PO" => "pickoffs",
        "AB" | "p_ab" => "at_bats",
        "2B" | "p_2b" => "doubles",
        "3B" | "p_3b" => "triples",
        "IBB" | "p_ibb" => "intentional_walks",
        "GIDP" | "GDP" | "p_gidp" => "grounded_into_double_play",
        "SF" | "p_sf" => "sacrifice_flies",
        "ROE" | "p_roe" => "reached_on_error",

        // Win probability and leverage
        "leverage_index_avg" | "p_leverage_index_avg" | "aLI" => "average_leverage_index",
        "wpa_def" | "p_wpa_def" | "WPA" => "win_probability_added",
        "cli_avg" | "p_cli_avg" | "cLI" => "clutch_leverage_index",
        "re24_def" | "p_re24_def" | "RE24" => "run_expectancy_24",

        // Fantasy scoring
        "draftkings_points" | "DK" => "draftkings_points",
        "fanduel_points" | "FD" => "fanduel_points",

        _ => return None,
    };
    Some(name)
}

fn team_alias(raw: &str) -> Option<&'static str> {
    let name = match raw {
        "team_name" | "team_ID" | "Tm" | "Team" => "team_id",
        "G" | "b_games" | "G_batting" => "games",
        "runs_per_game" | "b_runs_per_game" | "R/G" => "runs_per_game",
        "PA" | "b_pa" => "plate_appearances",
        "AB" | "b_ab" => "at_bats",
        "R" | "b_r" => "runs",
        "H" | "b_h" => "hits",
        "2B" | "b_doubles" => "doubles",
        "3B" | "b_triples" => "triples",
        "HR" | "b_hr" => "home_runs",
        "RBI" | "b_rbi" => "rbi",
        "SB" | "b_sb" => "stolen_bases",
        "CS" | "b_cs" => "caught_stealing",
        "BB" | "b_bb" => "walks",
        "SO" | "b_so" => "strikeouts",
        "batting_avg" | "b_batting_avg" | "BA" => "batting_avg",
        "onbase_perc" | "b_onbase_perc" | "OBP" => "on_base_pct",
        "slugging_perc" | "b_slugging_perc" | "SLG" => "slugging_pct",
        "onbase_plus_slugging" | "b_onbase_plus_slugging" | "OPS" => "ops",
        "onbase_plus_slugging_plus" | "b_onbase_plus_slugging_plus" | "OPS+" => "ops_plus",
        "TB" | "b_tb" => "total_bases",
        "GIDP" | "GDP" | "b_gidp" => "gidp",
        "HBP" | "b_hbp" => "hit_by_pitch",
        "SH" | "b_sh" => "sacrifice_hits",
        "SF" | "b_sf" => "sacrifice_flies",
        "IBB" | "b_ibb" => "intentional_walks",
        _ => return None,
    };
    Some(name)
}
