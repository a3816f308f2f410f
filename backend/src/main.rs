//! Spacetraveling blog server.

mod comments;
mod config;
mod error;
mod handlers;
mod page_cache;
mod preview;
mod render;
mod request_context;
mod routes;
mod state;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::AppConfig::from_env()?;

    tracing::info!("Starting Spacetraveling server");
    tracing::info!("CMS endpoint: {}", config.cms_endpoint);
    tracing::info!("Public directory: {}", config.public_dir.display());

    let addr = config.listen_addr();
    let app_state = state::AppState::new(config)?;
    let app = routes::create_router(app_state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
