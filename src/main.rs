//! Service entry point.
//!
//! Reads configuration from the environment once, wires the headless
//! renderer into the router state, and serves the HTTP surface:
//!
//!   GET  /            liveness
//!   POST /render      shadow-packaged embed
//!   POST /render-raw  raw rendered document
//!   POST /render-css  extracted/flattened CSS

use anyhow::Result;
use shadow_render::{app, AppState, ChromiumRenderer, Config};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(
        %addr,
        auth = config.token.is_some(),
        wait_ms = config.render_wait.as_millis() as u64,
        allowed_style_hosts = ?config.allowed_style_hosts,
        "renderer listening"
    );

    let state = AppState::new(config, Arc::new(ChromiumRenderer::new()));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
