//! Filesystem implementation of the `WorldStorage` port.
//!
//! The accepted world of a server lives in `<root>/<server id>/`. Uploads
//! unpack into `<root>/<server id>.upload/` and are renamed into place on
//! commit. Archive entries whose paths would escape the staging directory
//! are rejected, as are archives that unpack past the configured size.

use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use mchost_common::ServerId;
use walkdir::WalkDir;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::application::ports::{ExtractError, WorldStorage};

pub struct ZipWorldStorage {
    root: PathBuf,
    max_extracted_bytes: u64,
}

impl ZipWorldStorage {
    /// Storage under `root`, resolved against the working directory so the
    /// paths it hands out can be used as container bind sources.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be read.
    pub fn new(root: &Path, max_extracted_bytes: u64) -> Result<Self> {
        let root = std::path::absolute(root)
            .with_context(|| format!("resolving world directory {}", root.display()))?;
        Ok(Self {
            root,
            max_extracted_bytes,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn world_dir(&self, server_id: ServerId) -> PathBuf {
        self.root.join(server_id.to_string())
    }

    fn staging_dir(&self, server_id: ServerId) -> PathBuf {
        self.root.join(format!("{server_id}.upload"))
    }

    fn previous_dir(&self, server_id: ServerId) -> PathBuf {
        self.root.join(format!("{server_id}.previous"))
    }
}

fn remove_dir_if_exists(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing {}", dir.display())),
    }
}

fn zip_error(err: ZipError) -> ExtractError {
    match err {
        ZipError::Io(e) if e.kind() != io::ErrorKind::InvalidData => {
            ExtractError::Io(anyhow::Error::new(e).context("reading world archive"))
        }
        _ => ExtractError::Corrupt,
    }
}

/// Unpack `archive` into `dest`, writing at most `limit` bytes in total.
fn extract_sync(archive: Vec<u8>, dest: &Path, limit: u64) -> Result<(), ExtractError> {
    let mut zip = ZipArchive::new(Cursor::new(archive)).map_err(zip_error)?;
    let mut remaining = limit;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(zip_error)?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(entry = entry.name(), "archive entry escapes extraction directory");
            return Err(ExtractError::Corrupt);
        };
        let target = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("creating {}", target.display()))?;
            continue;
        }
        // Declared sizes can lie; the copy below is bounded regardless.
        if entry.size() > remaining {
            return Err(ExtractError::TooLarge { limit });
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut out = fs::File::create(&target)
            .with_context(|| format!("creating {}", target.display()))?;
        let mut bounded = (&mut entry).take(remaining.saturating_add(1));
        let written = match io::copy(&mut bounded, &mut out) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => return Err(ExtractError::Corrupt),
            Err(e) => {
                return Err(ExtractError::Io(
                    anyhow::Error::new(e).context(format!("writing {}", target.display())),
                ));
            }
        };
        if written > remaining {
            return Err(ExtractError::TooLarge { limit });
        }
        remaining -= written;
    }
    Ok(())
}

/// Shallowest directory under `root` containing `marker`; ties broken by path.
fn find_marker_sync(root: &Path, marker: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name() == marker)
        .filter_map(|e| {
            let depth = e.depth();
            e.path().parent().map(|p| (depth, p.to_path_buf()))
        })
        .min()
        .map(|(_, dir)| dir)
}

/// Move `staging` to `target`, keeping the old `target` at `previous` until
/// the move succeeds.
fn swap_in(staging: &Path, target: &Path, previous: &Path) -> Result<()> {
    remove_dir_if_exists(previous)?;
    let had_world = target.exists();
    if had_world {
        fs::rename(target, previous)
            .with_context(|| format!("moving {} aside", target.display()))?;
    }
    if let Err(e) = fs::rename(staging, target) {
        if had_world {
            if let Err(restore) = fs::rename(previous, target) {
                tracing::error!(
                    world = %target.display(),
                    error = %restore,
                    "failed to restore previous world"
                );
            }
        }
        return Err(e).with_context(|| format!("moving {} into place", staging.display()));
    }
    if had_world {
        if let Err(e) = remove_dir_if_exists(previous) {
            tracing::warn!(dir = %previous.display(), error = %e, "failed to remove replaced world");
        }
    }
    Ok(())
}

#[async_trait]
impl WorldStorage for ZipWorldStorage {
    async fn prepare(&self, server_id: ServerId) -> Result<PathBuf> {
        let dir = self.staging_dir(server_id);
        let task_dir = dir.clone();
        tokio::task::spawn_blocking(move || {
            remove_dir_if_exists(&task_dir)?;
            fs::create_dir_all(&task_dir).with_context(|| format!("creating {}", task_dir.display()))
        })
        .await
        .context("world prepare task panicked")??;
        Ok(dir)
    }

    async fn extract(&self, archive: Vec<u8>, dest: &Path) -> Result<(), ExtractError> {
        let dest = dest.to_path_buf();
        let limit = self.max_extracted_bytes;
        tokio::task::spawn_blocking(move || extract_sync(archive, &dest, limit))
            .await
            .context("world extract task panicked")?
    }

    async fn find_marker(&self, root: &Path, marker: &str) -> Result<Option<PathBuf>> {
        let root = root.to_path_buf();
        let marker = marker.to_string();
        tokio::task::spawn_blocking(move || find_marker_sync(&root, &marker))
            .await
            .context("world search task panicked")
    }

    async fn commit(
        &self,
        server_id: ServerId,
        staging: &Path,
        world_root: &Path,
    ) -> Result<PathBuf> {
        let relative = world_root
            .strip_prefix(staging)
            .with_context(|| format!("{} is outside {}", world_root.display(), staging.display()))?
            .to_path_buf();
        let target = self.world_dir(server_id);
        let previous = self.previous_dir(server_id);
        let staging = staging.to_path_buf();
        let task_target = target.clone();
        tokio::task::spawn_blocking(move || swap_in(&staging, &task_target, &previous))
            .await
            .context("world commit task panicked")??;
        Ok(target.join(relative))
    }

    async fn discard(&self, dir: &Path) -> Result<()> {
        let dir = dir.to_path_buf();
        tokio::task::spawn_blocking(move || remove_dir_if_exists(&dir))
            .await
            .context("world discard task panicked")?
    }

    async fn world_exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}
