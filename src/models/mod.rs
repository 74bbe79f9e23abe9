//! Data models for pitchlog.

mod game_log;
mod player;
mod team_stats;

pub use game_log::{GameLogRecord, StatLine, StatValue};
pub use player::{Player, PlayerListing, PlayerSummary};
pub use team_stats::TeamStatRecord;
