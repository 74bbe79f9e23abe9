//! Player identity and read-side aggregates.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A tracked pitcher. The name, once known, is never cleared by a later
/// scrape that fails to find one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Player {
    pub player_id: String,
    pub player_name: Option<String>,
    pub last_updated: DateTime<Utc>,
}

/// A player row joined with their game-log coverage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerListing {
    pub player_id: String,
    pub player_name: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub games: i64,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
}

/// Career aggregate over every stored game for one player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSummary {
    pub player_id: String,
    pub games: i64,
    /// Innings in decimal form (13.0 for 6.1 + 6.2).
    pub total_innings: Option<f64>,
    pub total_strikeouts: Option<i64>,
    pub avg_strikeouts_per_game: Option<f64>,
    pub total_walks: Option<i64>,
    pub total_hits: Option<i64>,
    pub total_earned_runs: Option<i64>,
    pub avg_era: Option<f64>,
}
