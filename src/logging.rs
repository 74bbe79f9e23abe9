//! Tracing setup.
//!
//! The subscriber is installed once from `main` with an explicit
//! [`LogConfig`]; library code only emits events.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variables that turn on verbose output, in lookup order.
pub const VERBOSE_ENV_VARS: &[&str] = &["PITCHLOG_VERBOSE", "BASEBALL_VERBOSE"];

/// How the process should log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub verbose: bool,
}

impl LogConfig {
    /// The `--verbose` flag wins; otherwise the environment decides.
    pub fn resolve(cli_verbose: bool) -> Self {
        Self::resolve_with(cli_verbose, |key| std::env::var(key).ok())
    }

    fn resolve_with(cli_verbose: bool, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if cli_verbose {
            return Self { verbose: true };
        }
        let verbose = VERBOSE_ENV_VARS
            .iter()
            .find_map(|key| lookup(key))
            .is_some_and(|value| is_truthy(&value));
        Self { verbose }
    }

    /// Filter used when `RUST_LOG` is not set.
    pub fn default_filter(&self) -> &'static str {
        if self.verbose {
            "pitchlog=debug"
        } else {
            "pitchlog=warn"
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Install the global subscriber. `RUST_LOG` overrides the level filter.
pub fn init(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter()));

    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
