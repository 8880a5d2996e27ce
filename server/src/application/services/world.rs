//! Application service — world archive uploads.
//!
//! Archives unpack into a staging directory. Only once `level.dat` is found
//! does the staging directory replace the accepted world and the record
//! point at it. A rejected archive leaves the previous world, the record
//! and the disk as they were.

use std::path::Path;
use std::sync::Arc;

use mchost_common::{OperationReport, ServerId};

use crate::application::ports::{ExtractError, ServerStore, WorldStorage};
use crate::application::services::lifecycle::Actor;
use crate::application::services::locks::RecordLocks;
use crate::domain::{LifecycleError, WorldUploadError};

/// File whose presence marks the root of a world.
pub const WORLD_MARKER: &str = "level.dat";

#[derive(Clone)]
pub struct WorldUploads {
    store: Arc<dyn ServerStore>,
    storage: Arc<dyn WorldStorage>,
    locks: Arc<RecordLocks>,
    max_bytes: usize,
}

impl WorldUploads {
    #[must_use]
    pub fn new(
        store: Arc<dyn ServerStore>,
        storage: Arc<dyn WorldStorage>,
        locks: Arc<RecordLocks>,
        max_bytes: usize,
    ) -> Self {
        Self {
            store,
            storage,
            locks,
            max_bytes,
        }
    }

    /// Replace the world of a server with the contents of a zip archive.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NotFound`], [`LifecycleError::Unsupported`] for
    /// web-hosting plans, [`LifecycleError::World`] when the archive is
    /// rejected, or [`LifecycleError::Internal`] on I/O failure.
    pub async fn upload(
        &self,
        actor: Actor,
        id: ServerId,
        filename: &str,
        archive: Vec<u8>,
    ) -> Result<OperationReport, LifecycleError> {
        let _guard = self.locks.acquire(id).await;
        let mut server = self
            .store
            .get(id)
            .await?
            .filter(|record| actor.can_access(record))
            .ok_or(LifecycleError::NotFound(id))?;
        if !server.plan_type.is_compute() {
            return Err(LifecycleError::Unsupported {
                operation: "Uploading a world",
                plan: server.plan_type,
            });
        }
        if !has_zip_extension(filename) {
            return Err(WorldUploadError::NotZip.into());
        }
        if archive.len() > self.max_bytes {
            return Err(WorldUploadError::TooLarge {
                limit: self.max_bytes,
            }
            .into());
        }

        let staging = self.storage.prepare(id).await?;
        let rejection = match self.storage.extract(archive, &staging).await {
            Ok(()) => None,
            Err(ExtractError::Corrupt) => Some(WorldUploadError::Corrupt.into()),
            Err(ExtractError::TooLarge { limit }) => {
                Some(WorldUploadError::Expanded { limit }.into())
            }
            Err(ExtractError::Io(err)) => Some(LifecycleError::Internal(err)),
        };
        if let Some(err) = rejection {
            self.discard(&staging).await;
            return Err(err);
        }

        let marker_dir = match self.storage.find_marker(&staging, WORLD_MARKER).await {
            Ok(Some(dir)) => dir,
            Ok(None) => {
                self.discard(&staging).await;
                return Err(WorldUploadError::MarkerMissing {
                    marker: WORLD_MARKER,
                }
                .into());
            }
            Err(err) => {
                self.discard(&staging).await;
                return Err(err.into());
            }
        };
        let world_root = match self.storage.commit(id, &staging, &marker_dir).await {
            Ok(root) => root,
            Err(err) => {
                self.discard(&staging).await;
                return Err(err.into());
            }
        };

        tracing::info!(server_id = id, world = %world_root.display(), "world uploaded");
        server.world_data_path = Some(world_root);
        self.store.save(&server).await?;
        Ok(OperationReport::ok(
            "World uploaded. Restart the server to use it.",
        ))
    }

    async fn discard(&self, dir: &Path) {
        if let Err(err) = self.storage.discard(dir).await {
            tracing::warn!(dir = %dir.display(), error = %err, "failed to remove rejected world");
        }
    }
}

fn has_zip_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}
