//! `mchost serve` — run the HTTP server.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::{self, AppState};
use crate::app::{AppContext, Services};

/// Run `mchost serve` until Ctrl-C.
///
/// # Errors
///
/// Returns an error if services cannot be constructed or the listener
/// cannot be bound.
pub async fn run(app: &AppContext) -> Result<()> {
    let config = &app.config;
    let services = Services::from_config(config).await?;
    if config.operator_token.is_none() {
        tracing::warn!("MCHOST_OPERATOR_TOKEN not set; operator API disabled");
    }
    let state = Arc::new(AppState {
        lifecycle: services.lifecycle,
        intake: services.intake,
        worlds: services.worlds,
        operator_token: config.operator_token.clone(),
    });
    let router = api::router(state, config.max_world_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(listen_addr = %config.listen_addr, "mchost server ready");
    app.output.info(&format!("Listening on http://{}", config.listen_addr));

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("mchost server shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) for graceful shutdown.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}
