use anyhow::{Context, Result};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("littlelemon_api=debug,tower_http=info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

/// Loads `.env` when present. A missing file is not an error.
pub fn init_env() {
    if let Err(err) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", err);
    }
}

pub async fn serve(service_name: &str, app: Router, config: &ServerConfig) -> Result<()> {
    let app = app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let address = config.address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    tracing::info!("{} listening on {}", service_name, address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("{} stopped", service_name);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
    }
}
