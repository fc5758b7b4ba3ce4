//! Pit Commander Server
//!
//! Race replay dashboard with REST API, SSE stream and AI commentary

use anyhow::{Context, Result};
use pit_server::{api, config::ServerConfig, state, strategy};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Pit Commander Server");

    let config = ServerConfig::load().context("loading configuration")?;
    let addr = config.bind_addr;

    let state = state::AppState::from_config(config)?;
    info!(
        "Loaded {} laps for {} cars, {} classified results",
        state.total_laps(),
        state.telemetry.car_numbers().len(),
        state.results.len()
    );

    let app = api::create_router(state.clone());

    // Strategy calls run alongside playback
    tokio::spawn(strategy::run(state.clone()));

    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
