//! pitchlog - pitching game-log and team batting stats collector.

mod cli;

use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use pitchlog::logging::{self, LogConfig};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    logging::init(&LogConfig::resolve(cli::is_verbose()));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing in-flight writes");
                cancel.cancel();
            }
        }
    });

    cli::run(cancel).await
}
