//! Typed domain error enums.
//!
//! All error types implement `thiserror::Error`. Display strings are shown to
//! tenants verbatim, so they read as complete sentences.

use mchost_common::{PlanError, PlanType, ServerId, UnknownPlanType};
use thiserror::Error;

// ── Lifecycle errors ──────────────────────────────────────────────────────────

/// Errors surfaced by the lifecycle controller's caller-facing operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Server {0} not found.")]
    NotFound(ServerId),

    #[error("{operation} is not supported for {plan} plans.")]
    Unsupported {
        operation: &'static str,
        plan: PlanType,
    },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Failed to start server on port {port}: {reason}")]
    StartFailed { port: u16, reason: String },

    #[error(transparent)]
    World(#[from] WorldUploadError),

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

// ── Intake errors ─────────────────────────────────────────────────────────────

/// Errors raised while turning a fulfilled payment into a server record.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Payment {payment} is missing metadata '{field}'.")]
    MissingMetadata {
        payment: String,
        field: &'static str,
    },

    #[error("Payment {payment} has an invalid tenant id '{value}'.")]
    InvalidTenant { payment: String, value: String },

    #[error(transparent)]
    UnknownPlan(#[from] UnknownPlanType),

    #[error("Invalid plan metadata: {0}")]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error("Failed to record server: {0:#}")]
    Store(#[source] anyhow::Error),
}

impl IntakeError {
    /// Whether redelivering the same event could succeed.
    ///
    /// Validation failures never will; storage failures might.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, IntakeError::Store(_))
    }
}

// ── Port allocation errors ────────────────────────────────────────────────────

/// Errors raised by the port allocation policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("No ports left above {0}.")]
    Exhausted(u16),

    #[error("Port {0} is already assigned.")]
    Taken(u16),
}

// ── World upload errors ───────────────────────────────────────────────────────

/// Reasons a world archive is rejected.
#[derive(Debug, Error)]
pub enum WorldUploadError {
    #[error("Please select a ZIP file.")]
    NotZip,

    #[error("The archive is larger than the {limit} byte limit.")]
    TooLarge { limit: usize },

    #[error("Invalid ZIP file.")]
    Corrupt,

    #[error("The archive unpacks to more than the {limit} byte limit.")]
    Expanded { limit: u64 },

    #[error("No valid world ({marker}) was found in the ZIP file.")]
    MarkerMissing { marker: &'static str },
}
