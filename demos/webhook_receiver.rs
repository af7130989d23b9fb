//! Listens for report completion webhooks.
//!
//! `PORT` (default 8080) selects the listening port. With
//! `SURMADO_DOWNLOAD_DIR` set, completed reports are also downloaded there in
//! the background.

use anyhow::Result;
use surmado::webhook::{self, ArtifactFetcher, FetchingHandler, LogHandler, ReceiverConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "surmado=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ReceiverConfig::from_env()?;

    match std::env::var("SURMADO_DOWNLOAD_DIR") {
        Ok(dir) => {
            let fetcher = ArtifactFetcher::spawn(dir)?;
            tracing::info!(dir = %fetcher.dir().display(), "downloading completed reports");
            webhook::run(config, FetchingHandler::new(LogHandler, fetcher)).await
        }
        Err(_) => webhook::run(config, LogHandler).await,
    }
}
