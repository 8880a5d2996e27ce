//! Operator-only routes.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use mchost_common::{CreateServerRequest, ServerRecord};
use subtle::ConstantTimeEq;

use crate::api::AppState;
use crate::api::error::ApiError;
use crate::api::extract::bearer_token;

/// Create a server without a payment. Disabled unless an operator token is
/// configured.
pub async fn create_server(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateServerRequest>,
) -> Result<(StatusCode, Json<ServerRecord>), ApiError> {
    let Some(expected) = state.operator_token.as_deref().filter(|t| !t.is_empty()) else {
        return Err(ApiError::Unauthorized("Operator access is disabled."));
    };
    if !bearer_token(&headers).is_some_and(|provided| token_matches(expected, provided)) {
        return Err(ApiError::Unauthorized("Invalid operator token."));
    }
    let record = state.intake.create_for_operator(&request).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Constant-time token comparison. Only the length can leak.
fn token_matches(expected: &str, provided: &str) -> bool {
    let expected = expected.as_bytes();
    let provided = provided.as_bytes();
    if expected.len() != provided.len() {
        return false;
    }
    expected.ct_eq(provided).into()
}
