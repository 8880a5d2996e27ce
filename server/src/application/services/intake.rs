//! Application service — provisioning intake.
//!
//! Turns fulfilled payments (and operator requests) into inactive server
//! records with a freshly allocated port. Nothing is started here.

use std::collections::HashMap;
use std::sync::Arc;

use mchost_common::{
    CreateServerRequest, PAYMENT_FAILED, PAYMENT_SUCCEEDED, PaymentEvent, PaymentObject, PlanSpec,
    PlanType, ServerId, ServerRecord, TenantId,
};

use crate::application::ports::{CreateError, CreateOutcome, ServerDraft, ServerStore};
use crate::domain::{IntakeError, PortAllocator};

/// What the intake did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    Provisioned(ServerRecord),
    /// The payment had already been fulfilled; nothing new was created.
    Duplicate { server_id: ServerId },
    /// The event type needs no action.
    Ignored { event_type: String },
}

#[derive(Clone)]
pub struct ProvisioningIntake {
    store: Arc<dyn ServerStore>,
    allocator: PortAllocator,
}

impl ProvisioningIntake {
    #[must_use]
    pub fn new(store: Arc<dyn ServerStore>, allocator: PortAllocator) -> Self {
        Self { store, allocator }
    }

    /// Handle a verified payment event.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError`] when a successful payment carries unusable
    /// metadata or the record cannot be stored. No record is created in
    /// either case.
    pub async fn handle_event(&self, event: &PaymentEvent) -> Result<IntakeOutcome, IntakeError> {
        match event.event_type.as_str() {
            PAYMENT_SUCCEEDED => self.fulfill(&event.data.object).await,
            PAYMENT_FAILED => {
                tracing::warn!(event = %event.id, payment = %event.data.object.id, "payment failed");
                Ok(IntakeOutcome::Ignored {
                    event_type: event.event_type.clone(),
                })
            }
            other => {
                tracing::debug!(event = %event.id, event_type = other, "ignoring payment event");
                Ok(IntakeOutcome::Ignored {
                    event_type: other.to_string(),
                })
            }
        }
    }

    /// Create a server directly, bypassing payment.
    ///
    /// # Errors
    ///
    /// Same validation and storage errors as [`Self::handle_event`].
    pub async fn create_for_operator(
        &self,
        request: &CreateServerRequest,
    ) -> Result<ServerRecord, IntakeError> {
        let plan_type: PlanType = request.plan_type.parse()?;
        let plan = PlanSpec::from_labels(
            request.cpu.as_deref(),
            request.ram.as_deref(),
            request.storage.as_deref(),
            request.backup.as_deref(),
        )?;
        let draft = ServerDraft {
            owner: request.owner,
            plan_type,
            plan,
            payment_id: None,
        };
        match self.create(draft).await? {
            CreateOutcome::Created(record) => {
                tracing::info!(server_id = record.id, owner = record.owner, port = record.port, "server created by operator");
                Ok(record)
            }
            CreateOutcome::AlreadyProcessed { server_id } => Err(IntakeError::Store(anyhow::anyhow!(
                "store reported server {server_id} as a duplicate of an operator request"
            ))),
        }
    }

    async fn fulfill(&self, payment: &PaymentObject) -> Result<IntakeOutcome, IntakeError> {
        let metadata = &payment.metadata;
        let owner_raw = required(payment, "user_id")?;
        let owner: TenantId = owner_raw
            .trim()
            .parse()
            .map_err(|_| IntakeError::InvalidTenant {
                payment: payment.id.clone(),
                value: owner_raw.to_string(),
            })?;
        let plan_type: PlanType = required(payment, "plan_type")?.parse()?;
        let plan = PlanSpec::from_labels(
            label(metadata, "cpu"),
            label(metadata, "ram"),
            label(metadata, "storage"),
            label(metadata, "backup"),
        )?;
        tracing::debug!(
            payment = %payment.id,
            description = label(metadata, "plan_description").unwrap_or_default(),
            "fulfilling payment"
        );

        let draft = ServerDraft {
            owner,
            plan_type,
            plan,
            payment_id: Some(payment.id.clone()),
        };
        match self.create(draft).await? {
            CreateOutcome::Created(record) => {
                tracing::info!(
                    server_id = record.id,
                    owner,
                    port = record.port,
                    plan = plan_type.tag(),
                    payment = %payment.id,
                    "server provisioned"
                );
                Ok(IntakeOutcome::Provisioned(record))
            }
            CreateOutcome::AlreadyProcessed { server_id } => {
                tracing::info!(server_id, payment = %payment.id, "payment already fulfilled");
                Ok(IntakeOutcome::Duplicate { server_id })
            }
        }
    }

    async fn create(&self, draft: ServerDraft) -> Result<CreateOutcome, IntakeError> {
        self.store
            .create(draft, self.allocator)
            .await
            .map_err(|err| match err {
                CreateError::Port(port) => IntakeError::Port(port),
                CreateError::Storage(source) => IntakeError::Store(source),
            })
    }
}

fn required<'a>(payment: &'a PaymentObject, field: &'static str) -> Result<&'a str, IntakeError> {
    label(&payment.metadata, field).ok_or_else(|| IntakeError::MissingMetadata {
        payment: payment.id.clone(),
        field,
    })
}

/// Metadata value with blank strings treated as absent.
fn label<'a>(metadata: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    metadata
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty())
}
