//! HTTP error mapping.
//!
//! Every failure is returned as an `OperationReport` with `success: false`,
//! so clients render errors and successes with the same shape.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mchost_common::OperationReport;
use thiserror::Error;

use crate::domain::{IntakeError, LifecycleError, WorldUploadError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(&'static str),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Intake(#[from] IntakeError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Lifecycle(err) => match err {
                LifecycleError::NotFound(_) => StatusCode::NOT_FOUND,
                LifecycleError::World(
                    WorldUploadError::TooLarge { .. } | WorldUploadError::Expanded { .. },
                ) => StatusCode::PAYLOAD_TOO_LARGE,
                LifecycleError::Unsupported { .. }
                | LifecycleError::InvalidSettings(_)
                | LifecycleError::World(_) => StatusCode::UNPROCESSABLE_ENTITY,
                LifecycleError::StartFailed { .. } => StatusCode::BAD_GATEWAY,
                LifecycleError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Intake(err) if err.is_retryable() => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Intake(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "Internal error.".to_string()
        } else {
            self.to_string()
        };
        (status, Json(OperationReport::failed(message))).into_response()
    }
}
