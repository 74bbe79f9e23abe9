//! pitchlog - pitching game-log and team batting stats collection.
//!
//! Fetches game-log and league batting tables from a stats site, normalizes
//! them to a fixed schema and merges them idempotently into SQLite.

pub mod config;
pub mod export;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod repository;
pub mod scrapers;
pub mod services;
