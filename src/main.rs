//! Line Watch terminal dashboard.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use linewatch::transport::{Feed, LineClient, RequestSequencer, FEED_CAPACITY};
use linewatch::tui::{self, App};
use linewatch::{telemetry, DashboardConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let config = DashboardConfig::load().context("Invalid dashboard configuration")?;
    let _log_guard = telemetry::init_logging(&config.log_dir, &config.log_level)?;
    info!("Starting Line Watch v{}", env!("CARGO_PKG_VERSION"));

    let (tx, rx) = mpsc::channel(FEED_CAPACITY);
    let client = Arc::new(LineClient::new(config.server_url.clone()));
    let feed = Feed::new(client, Arc::new(RequestSequencer::new()), tx);

    tui::run(App::new(config, feed, rx)).await
}
