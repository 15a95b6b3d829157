// FinFit Debt Management - Web Server
// REST API with Axum

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use finfit::api::{router, AppState};
use finfit::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    finfit::logging::init(&config.log_filter);

    info!(version = finfit::VERSION, "starting FinFit debt management server");

    let state = Arc::new(AppState::from_config(&config)?);
    match &config.database_path {
        Some(path) => info!(path = %path.display(), "persisting to SQLite"),
        None => info!("no database configured, records are kept in memory only"),
    }

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed
        std::future::pending::<()>().await;
    }
}
