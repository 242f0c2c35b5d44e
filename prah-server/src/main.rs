//! PRAH Server
//!
//! Serves session schedules, replay bundles and team radio over HTTP

use anyhow::{Context, Result};
use prah_server::{api, config::ServerConfig, open_source, state::AppState};
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

    info!("Starting PRAH Server");

    let config = ServerConfig::from_env()?;
    std::fs::create_dir_all(&config.cache_dir).with_context(|| {
        format!("Failed to create cache dir {}", config.cache_dir.display())
    })?;

    let source = open_source(config.source, &config.cache_dir);
    info!(
        "Using {} source (cache dir {})",
        source.name(),
        config.cache_dir.display()
    );

    let state = AppState::new(source).with_allowed_origins(config.allowed_origins.clone());
    let app = api::create_router(state);

    let addr = config.bind_addr()?;
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
