//! Movies server binary.
//!
//! Hosts the movie-info and review catalogs and the aggregated movie view.
//! By default the aggregator talks to this same process over HTTP; point
//! `--movie-info-url` / `--reviews-url` elsewhere to split the services.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use server::{AppState, ServerConfig, router};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();
    info!(
        bind = %config.bind,
        movie_info_url = %config.movie_info_url(),
        reviews_url = %config.reviews_url(),
        max_retries = config.retry.max_retries,
        "Starting movies server"
    );

    let state = AppState::from_config(&config).context("Building upstream clients")?;
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Binding {}", config.bind))?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .context("Serving HTTP")?;

    info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl-C, closing the live feeds first so open streams can finish
async fn shutdown_signal(state: AppState) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "Failed to listen for shutdown signal");
    }
    info!("Shutdown requested");
    state.close_feeds();
}
