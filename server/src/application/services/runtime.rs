//! Application service — container runtime adapter.
//!
//! Turns a server record into a running container and tears containers down.
//! Container names are derived from the port, so a container orphaned by a
//! crash is replaced on the next start instead of blocking it.

use std::sync::Arc;

use mchost_common::ServerRecord;
use thiserror::Error;

use crate::application::ports::{ContainerEngine, EngineError, WorldStorage};
use crate::domain::{ContainerSpec, ContainerSpecError};

/// Errors raised while starting a container.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Spec(#[from] ContainerSpecError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Result of tearing down a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    Removed,
    /// The engine no longer knew the container.
    AlreadyGone,
    Failed(String),
}

/// Starts and stops server containers through a [`ContainerEngine`].
#[derive(Clone)]
pub struct ContainerRuntime {
    engine: Arc<dyn ContainerEngine>,
    worlds: Arc<dyn WorldStorage>,
}

impl ContainerRuntime {
    #[must_use]
    pub fn new(engine: Arc<dyn ContainerEngine>, worlds: Arc<dyn WorldStorage>) -> Self {
        Self { engine, worlds }
    }

    /// Launch a container for `server` and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Spec`] when the record cannot run in a
    /// container and [`RuntimeError::Engine`] when pulling, creating or
    /// starting fails.
    pub async fn start(&self, server: &ServerRecord) -> Result<String, RuntimeError> {
        let world_present = match &server.world_data_path {
            Some(path) => self.worlds.world_exists(path).await,
            None => false,
        };
        let spec = ContainerSpec::for_server(server, world_present)?;

        match self.engine.stop_and_remove(&spec.name).await {
            Ok(()) => tracing::info!(container = %spec.name, "removed stale container"),
            Err(EngineError::NotFound(_)) => {}
            Err(err) => tracing::debug!(container = %spec.name, error = %err, "stale container cleanup failed"),
        }

        self.engine.ensure_image(spec.image).await?;
        let id = self.engine.run(&spec).await?;
        tracing::info!(
            server_id = server.id,
            container = %spec.name,
            image = spec.image,
            world = spec.volume.is_some(),
            "container started"
        );
        Ok(id)
    }

    /// Stop and remove a container. Never fails; the outcome says what happened.
    pub async fn stop(&self, container_ref: &str) -> StopOutcome {
        match self.engine.stop_and_remove(container_ref).await {
            Ok(()) => {
                tracing::info!(container = container_ref, "container removed");
                StopOutcome::Removed
            }
            Err(EngineError::NotFound(_)) => {
                tracing::debug!(container = container_ref, "container already gone");
                StopOutcome::AlreadyGone
            }
            Err(err) => StopOutcome::Failed(err.to_string()),
        }
    }
}
