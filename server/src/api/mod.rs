//! HTTP surface.
//!
//! Tenant routes identify the caller through the `X-Tenant-Id` header set by
//! the fronting proxy. The payment webhook expects events whose signature has
//! already been verified upstream. The operator route requires the configured
//! bearer token.

pub mod admin;
pub mod error;
pub mod extract;
pub mod servers;
pub mod webhook;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use tower_http::trace::TraceLayer;

use crate::application::services::{LifecycleController, ProvisioningIntake, WorldUploads};

pub use error::ApiError;
pub use extract::{TENANT_HEADER, Tenant};

/// Shared state handed to every handler.
pub struct AppState {
    pub lifecycle: LifecycleController,
    pub intake: ProvisioningIntake,
    pub worlds: WorldUploads,
    pub operator_token: Option<String>,
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// Build the application router. `max_body_bytes` caps request bodies,
/// world uploads included.
pub fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/servers", get(servers::list))
        .route("/servers/{id}", delete(servers::remove))
        .route("/servers/{id}/start", post(servers::start))
        .route("/servers/{id}/stop", post(servers::stop))
        .route("/servers/{id}/settings", put(servers::update_settings))
        .route("/servers/{id}/world", put(servers::upload_world))
        .route("/webhooks/payment", post(webhook::payment))
        .route("/admin/servers", post(admin::create_server))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
