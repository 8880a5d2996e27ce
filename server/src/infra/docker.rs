//! Docker Engine adapter for the `ContainerEngine` port.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions,
    StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, PortBinding};
use futures::TryStreamExt;

use crate::application::ports::{ContainerEngine, EngineError};
use crate::domain::ContainerSpec;

const NOT_MODIFIED: u16 = 304;
const NOT_FOUND: u16 = 404;

/// Container engine backed by the local Docker daemon.
pub struct BollardEngine {
    docker: Docker,
    stop_timeout: Duration,
}

impl BollardEngine {
    /// Connect using the platform default socket or named pipe.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be configured. The daemon
    /// itself is not contacted until the first request.
    pub fn connect(stop_timeout: Duration) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults().context("configuring Docker client")?;
        Ok(Self {
            docker,
            stop_timeout,
        })
    }
}

fn status_code(err: &DockerError) -> Option<u16> {
    match err {
        DockerError::DockerResponseServerError { status_code, .. } => Some(*status_code),
        _ => None,
    }
}

fn engine_error(container: &str, err: &DockerError) -> EngineError {
    if status_code(err) == Some(NOT_FOUND) {
        EngineError::NotFound(container.to_string())
    } else {
        EngineError::Api(err.to_string())
    }
}

/// Docker create-container body for `spec`.
fn container_config(spec: &ContainerSpec) -> Config<String> {
    let port_key = spec.port.container_key();
    let port_bindings = HashMap::from([(
        port_key.clone(),
        Some(vec![PortBinding {
            host_ip: None,
            host_port: Some(spec.port.host_port.to_string()),
        }]),
    )]);
    let host_config = HostConfig {
        port_bindings: Some(port_bindings),
        nano_cpus: Some(spec.nano_cpus),
        memory: Some(spec.memory_bytes),
        binds: spec.volume.as_ref().map(|v| vec![v.to_bind_string()]),
        ..Default::default()
    };
    Config {
        image: Some(spec.image.to_string()),
        env: Some(spec.env_pairs()),
        exposed_ports: Some(HashMap::from([(port_key, HashMap::new())])),
        host_config: Some(host_config),
        ..Default::default()
    }
}

#[async_trait]
impl ContainerEngine for BollardEngine {
    async fn ensure_image(&self, image: &str) -> Result<(), EngineError> {
        match self.docker.inspect_image(image).await {
            Ok(_) => return Ok(()),
            Err(err) if status_code(&err) == Some(NOT_FOUND) => {}
            Err(err) => return Err(EngineError::Api(err.to_string())),
        }
        tracing::info!(image, "pulling image");
        let options = CreateImageOptions {
            from_image: image,
            tag: "latest",
            ..Default::default()
        };
        self.docker
            .create_image(Some(options), None, None)
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| EngineError::Api(format!("pulling {image}: {e}")))?;
        Ok(())
    }

    async fn run(&self, spec: &ContainerSpec) -> Result<String, EngineError> {
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };
        let created = self
            .docker
            .create_container(Some(options), container_config(spec))
            .await
            .map_err(|e| EngineError::Api(e.to_string()))?;
        for warning in &created.warnings {
            tracing::warn!(container = %spec.name, warning, "docker create warning");
        }

        if let Err(err) = self
            .docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await
        {
            // A created-but-unstarted container would block the name on retry.
            let _ = self
                .docker
                .remove_container(
                    &created.id,
                    Some(RemoveContainerOptions {
                        force: true,
                        ..Default::default()
                    }),
                )
                .await;
            return Err(EngineError::Api(err.to_string()));
        }
        Ok(created.id)
    }

    async fn stop_and_remove(&self, container_ref: &str) -> Result<(), EngineError> {
        let t = i64::try_from(self.stop_timeout.as_secs()).unwrap_or(i64::MAX);
        match self
            .docker
            .stop_container(container_ref, Some(StopContainerOptions { t }))
            .await
        {
            Ok(()) => {}
            Err(err) if status_code(&err) == Some(NOT_MODIFIED) => {}
            Err(err) => return Err(engine_error(container_ref, &err)),
        }
        self.docker
            .remove_container(
                container_ref,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| engine_error(container_ref, &e))
    }
}
