//! Configuration management for pitchlog.
//!
//! Settings come from an optional TOML file (`pitchlog.toml` in the working
//! directory, or the path given with `--config`). Every field has a default;
//! command-line flags override individual values afterwards.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::scrapers::{RateLimitConfig, RetryPolicy};

/// Default settings file looked up in the working directory.
pub const DEFAULT_CONFIG_FILENAME: &str = "pitchlog.toml";

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "baseball.db";

/// Errors that stop a run before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid base URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    #[error("malformed CSV in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("{path} has no 'player_id' or 'Pitcher_ID' column")]
    MissingColumn { path: PathBuf },

    #[error("{0}")]
    Invalid(String),
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Root of the stats site.
    pub base_url: String,
    /// None = default UA, "impersonate" = real browser UA, else custom.
    pub user_agent: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Target request rate against the site.
    pub requests_per_second: f64,
    /// Players fetched concurrently.
    pub concurrency: usize,
    /// Attempts per page before giving up.
    pub max_attempts: u32,
    /// First retry delay in milliseconds; doubles each attempt.
    pub backoff_base_ms: u64,
    /// Earliest season scraped when no years are given.
    pub first_year: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_FILENAME),
            base_url: "https://www.baseball-reference.com".to_string(),
            user_agent: None,
            request_timeout_secs: 15,
            requests_per_second: 1.0,
            concurrency: 4,
            max_attempts: 3,
            backoff_base_ms: 1000,
            first_year: 2021,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from `pitchlog.toml` if present.
    /// An explicit path that does not exist is an error; a missing default
    /// file just means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILENAME), false),
        };

        if !explicit && !path.exists() {
            debug!("No {} found, using defaults", DEFAULT_CONFIG_FILENAME);
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let settings = Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        debug!("Loaded settings from {}", path.display());
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Reject values that would make a scrape misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".into()));
        }
        if !self.requests_per_second.is_finite() || self.requests_per_second < 0.0 {
            return Err(ConfigError::Invalid(
                "requests_per_second must be a non-negative number".into(),
            ));
        }
        Ok(())
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidUrl {
            url: self.base_url.clone(),
            source,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig::from_rate(self.requests_per_second)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.backoff_base_ms),
        }
    }
}
