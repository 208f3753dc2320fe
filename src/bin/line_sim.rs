//! Stand-alone line server for local runs of the dashboard.

use std::time::Duration;

use anyhow::{Context, Result};
use linewatch::sim::{self, SimState};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "127.0.0.1:5000";
const DEFAULT_TICK_MS: u64 = 2000;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("linewatch=debug,tower_http=info")),
        )
        .with_target(true)
        .init();

    let addr = std::env::var("LINE_SIM_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let tick = std::env::var("LINE_SIM_TICK_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .unwrap_or(DEFAULT_TICK_MS);

    let state = SimState::default();
    let clock = sim::spawn_clock(state.clone(), Duration::from_millis(tick));
    info!("Production clock advancing every {} ms", tick);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let served = sim::serve(listener, state).await;
    clock.abort();
    served
}
