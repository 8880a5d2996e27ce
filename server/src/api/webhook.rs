//! Payment provider webhook.
//!
//! Redelivered events are acknowledged without creating a second server.
//! Validation failures answer 400 so the provider stops retrying; storage
//! failures answer 500 so it retries.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use mchost_common::{PaymentEvent, ServerId};
use serde::Serialize;

use crate::api::AppState;
use crate::api::error::ApiError;
use crate::application::services::IntakeOutcome;

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<ServerId>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

pub async fn payment(
    State(state): State<Arc<AppState>>,
    Json(event): Json<PaymentEvent>,
) -> Result<Json<WebhookAck>, ApiError> {
    let ack = match state.intake.handle_event(&event).await {
        Ok(IntakeOutcome::Provisioned(record)) => WebhookAck {
            status: "success",
            server_id: Some(record.id),
            duplicate: false,
        },
        Ok(IntakeOutcome::Duplicate { server_id }) => WebhookAck {
            status: "success",
            server_id: Some(server_id),
            duplicate: true,
        },
        Ok(IntakeOutcome::Ignored { .. }) => WebhookAck {
            status: "ignored",
            server_id: None,
            duplicate: false,
        },
        Err(err) => {
            tracing::warn!(event = %event.id, error = %err, "payment event rejected");
            return Err(err.into());
        }
    };
    Ok(Json(ack))
}
