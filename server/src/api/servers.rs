//! Tenant-facing server routes.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use mchost_common::{OperationReport, ServerId, ServerRecord, SettingsUpdate};
use serde::Deserialize;

use crate::api::AppState;
use crate::api::error::ApiError;
use crate::api::extract::Tenant;
use crate::application::services::Actor;

type ReportResult = Result<Json<OperationReport>, ApiError>;

pub async fn list(
    State(state): State<Arc<AppState>>,
    Tenant(owner): Tenant,
) -> Result<Json<Vec<ServerRecord>>, ApiError> {
    Ok(Json(state.lifecycle.list(Actor::Tenant(owner)).await?))
}

pub async fn start(
    State(state): State<Arc<AppState>>,
    Tenant(owner): Tenant,
    Path(id): Path<ServerId>,
) -> ReportResult {
    Ok(Json(state.lifecycle.start(Actor::Tenant(owner), id).await?))
}

pub async fn stop(
    State(state): State<Arc<AppState>>,
    Tenant(owner): Tenant,
    Path(id): Path<ServerId>,
) -> ReportResult {
    Ok(Json(state.lifecycle.stop(Actor::Tenant(owner), id).await?))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    Tenant(owner): Tenant,
    Path(id): Path<ServerId>,
) -> ReportResult {
    Ok(Json(state.lifecycle.delete(Actor::Tenant(owner), id).await?))
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Tenant(owner): Tenant,
    Path(id): Path<ServerId>,
    Json(update): Json<SettingsUpdate>,
) -> ReportResult {
    Ok(Json(
        state
            .lifecycle
            .update_settings(Actor::Tenant(owner), id, &update)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct WorldQuery {
    pub filename: String,
}

/// Raw zip body; the original file name travels in `?filename=`.
pub async fn upload_world(
    State(state): State<Arc<AppState>>,
    Tenant(owner): Tenant,
    Path(id): Path<ServerId>,
    Query(query): Query<WorldQuery>,
    body: Bytes,
) -> ReportResult {
    Ok(Json(
        state
            .worlds
            .upload(Actor::Tenant(owner), id, &query.filename, body.to_vec())
            .await?,
    ))
}
