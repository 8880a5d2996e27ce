//! Application service — server lifecycle use-cases.
//!
//! Start, stop, delete and settings updates. Every operation takes the
//! record's lock first, so two operations on the same server never
//! interleave. Teardown is total: it runs every step even when earlier steps
//! fail, and reports leftovers on the `mchost::reconcile` log target.

use std::sync::Arc;

use mchost_common::{OperationReport, Protocol, ServerId, ServerRecord, SettingsUpdate, TenantId};

use crate::application::ports::ServerStore;
use crate::application::services::exposure::{ExternalExposure, NetworkExposureManager};
use crate::application::services::locks::RecordLocks;
use crate::application::services::runtime::{ContainerRuntime, StopOutcome};
use crate::domain::{LifecycleError, validate_settings};

/// Who is asking. Tenants only see their own records; the operator sees all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Tenant(TenantId),
    Operator,
}

impl Actor {
    #[must_use]
    pub fn can_access(self, record: &ServerRecord) -> bool {
        match self {
            Actor::Tenant(id) => record.owner == id,
            Actor::Operator => true,
        }
    }

    /// Owner filter for listings.
    #[must_use]
    pub fn owner_filter(self) -> Option<TenantId> {
        match self {
            Actor::Tenant(id) => Some(id),
            Actor::Operator => None,
        }
    }
}

/// Orchestrates exposure and container runtime against persisted records.
#[derive(Clone)]
pub struct LifecycleController {
    store: Arc<dyn ServerStore>,
    exposure: NetworkExposureManager,
    runtime: ContainerRuntime,
    locks: Arc<RecordLocks>,
}

impl LifecycleController {
    #[must_use]
    pub fn new(
        store: Arc<dyn ServerStore>,
        exposure: NetworkExposureManager,
        runtime: ContainerRuntime,
        locks: Arc<RecordLocks>,
    ) -> Self {
        Self {
            store,
            exposure,
            runtime,
            locks,
        }
    }

    /// Records visible to `actor`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Internal`] if the store cannot be read.
    pub async fn list(&self, actor: Actor) -> Result<Vec<ServerRecord>, LifecycleError> {
        Ok(self.store.list(actor.owner_filter()).await?)
    }

    /// (Re)start a server: tear down any previous container, map the port on
    /// the router, launch the container, then open the host firewall.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::NotFound`] if the record does not exist or belongs
    ///   to another tenant.
    /// - [`LifecycleError::Unsupported`] for web-hosting plans.
    /// - [`LifecycleError::StartFailed`] if the container could not be
    ///   launched; exposure is rolled back and the record left inactive.
    pub async fn start(&self, actor: Actor, id: ServerId) -> Result<OperationReport, LifecycleError> {
        let _guard = self.locks.acquire(id).await;
        let mut server = self.load(actor, id).await?;
        let port = server.port;
        let protocol = server.protocol();

        if let Some(old) = server.container_ref.clone() {
            if let StopOutcome::Failed(reason) = self.runtime.stop(&old).await {
                reconcile_warning(&server, "stop_container", &reason);
            }
            server.mark_inactive();
            self.store.save(&server).await?;
        }

        if !server.plan_type.is_compute() {
            return Err(LifecycleError::Unsupported {
                operation: "Restart",
                plan: server.plan_type,
            });
        }

        let mut warnings = Vec::new();
        if let ExternalExposure::Unavailable(reason) = self.exposure.open_external(port, protocol).await {
            warnings.push(format!(
                "Automatic port forwarding failed ({reason}). Forward port {port}/{protocol} on your router manually."
            ));
        }

        match self.runtime.start(&server).await {
            Ok(container_ref) => {
                server.mark_active(container_ref);
                if let Err(err) = self.exposure.open_local(port, protocol).await {
                    tracing::warn!(server_id = id, port, error = %err, "firewall rule not installed");
                    warnings.push(format!("Could not open port {port} in the host firewall: {err:#}"));
                }
                self.store.save(&server).await?;
                tracing::info!(server_id = id, port, "server started");
                Ok(OperationReport::ok(format!("Server (port {port}) started.")).with_warnings(warnings))
            }
            Err(err) => {
                tracing::error!(server_id = id, port, error = %err, "server start failed");
                self.release_exposure(&server, protocol).await;
                server.mark_inactive();
                self.store.save(&server).await?;
                Err(LifecycleError::StartFailed {
                    port,
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Stop a server and release its network exposure. Succeeds even when
    /// individual teardown steps fail.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NotFound`] for unknown or foreign records and
    /// [`LifecycleError::Internal`] if the record cannot be persisted.
    pub async fn stop(&self, actor: Actor, id: ServerId) -> Result<OperationReport, LifecycleError> {
        let _guard = self.locks.acquire(id).await;
        let mut server = self.load(actor, id).await?;
        self.teardown(&mut server).await;
        self.store.save(&server).await?;
        tracing::info!(server_id = id, port = server.port, "server stopped");
        Ok(OperationReport::ok(format!("Server (port {}) stopped.", server.port)))
    }

    /// Tear a server down and remove its record permanently.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NotFound`] for unknown or foreign records and
    /// [`LifecycleError::Internal`] if the record cannot be removed.
    pub async fn delete(&self, actor: Actor, id: ServerId) -> Result<OperationReport, LifecycleError> {
        let _guard = self.locks.acquire(id).await;
        let mut server = self.load(actor, id).await?;
        self.teardown(&mut server).await;
        self.store.delete(id).await?;
        tracing::info!(server_id = id, port = server.port, "server deleted");
        Ok(OperationReport::ok(format!("Server (port {}) deleted.", server.port)))
    }

    /// Change the version and mod list. Takes effect on the next start.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NotFound`], [`LifecycleError::Unsupported`] for
    /// web-hosting plans, or [`LifecycleError::InvalidSettings`].
    pub async fn update_settings(
        &self,
        actor: Actor,
        id: ServerId,
        update: &SettingsUpdate,
    ) -> Result<OperationReport, LifecycleError> {
        let _guard = self.locks.acquire(id).await;
        let mut server = self.load(actor, id).await?;
        if !server.plan_type.is_compute() {
            return Err(LifecycleError::Unsupported {
                operation: "Changing settings",
                plan: server.plan_type,
            });
        }
        let update = validate_settings(update).map_err(LifecycleError::InvalidSettings)?;
        server.version = update.version;
        server.mods = update.mods;
        self.store.save(&server).await?;
        tracing::info!(server_id = id, version = %server.version, "settings updated");
        Ok(OperationReport::ok(
            "Settings updated. Restart the server to apply them.",
        ))
    }

    async fn load(&self, actor: Actor, id: ServerId) -> Result<ServerRecord, LifecycleError> {
        self.store
            .get(id)
            .await?
            .filter(|record| actor.can_access(record))
            .ok_or(LifecycleError::NotFound(id))
    }

    /// Stop the container and close both exposures, leaving the record
    /// inactive. Step failures are logged, never returned.
    async fn teardown(&self, server: &mut ServerRecord) {
        if let Some(container_ref) = server.container_ref.clone() {
            if let StopOutcome::Failed(reason) = self.runtime.stop(&container_ref).await {
                reconcile_warning(server, "stop_container", &reason);
            }
        }
        self.release_exposure(server, server.protocol()).await;
        server.mark_inactive();
    }

    async fn release_exposure(&self, server: &ServerRecord, protocol: Protocol) {
        if let Err(err) = self.exposure.close_external(server.port, protocol).await {
            reconcile_warning(server, "close_external", &err.to_string());
        }
        if let Err(err) = self.exposure.close_local(server.port, protocol).await {
            reconcile_warning(server, "close_local", &format!("{err:#}"));
        }
    }
}

fn reconcile_warning(server: &ServerRecord, step: &'static str, reason: &str) {
    tracing::warn!(
        target: "mchost::reconcile",
        server_id = server.id,
        port = server.port,
        step,
        reason,
        "teardown step failed; resource may need manual cleanup"
    );
}
