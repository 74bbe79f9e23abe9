//! Service layer for pitchlog scrapes.
//!
//! Services own the fetch-normalize-merge pipeline and report progress
//! through events, so the CLI only handles display.

pub mod pitchers;
pub mod teams;

pub use pitchers::{
    PitcherScrapeConfig, PitcherScrapeService, ScrapeEvent, ScrapeReport, SeasonStatus,
};
pub use teams::{TeamScrapeReport, TeamScrapeService};
