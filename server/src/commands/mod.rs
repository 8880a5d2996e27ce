//! Command implementations

pub mod serve;
pub mod servers;

use crate::domain::{IntakeError, LifecycleError};

/// Stable machine-readable code for a command failure, used by `--json`.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    if let Some(err) = err.downcast_ref::<LifecycleError>() {
        return match err {
            LifecycleError::NotFound(_) => "not_found",
            LifecycleError::Unsupported { .. } => "unsupported",
            LifecycleError::InvalidSettings(_) => "invalid_settings",
            LifecycleError::World(_) => "world_rejected",
            LifecycleError::StartFailed { .. } => "start_failed",
            LifecycleError::Internal(_) => "internal",
        };
    }
    if let Some(err) = err.downcast_ref::<IntakeError>() {
        return if err.is_retryable() { "internal" } else { "invalid_request" };
    }
    "error"
}
