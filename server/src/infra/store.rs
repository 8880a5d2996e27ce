//! Infrastructure implementation of the `ServerStore` port.
//!
//! `JsonServerStore` keeps every record in one JSON document. The document is
//! held in memory behind an async mutex; each mutation is applied to a copy,
//! written atomically (temp file + rename) and only then swapped in, so the
//! in-memory view never runs ahead of what is on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use mchost_common::{DEFAULT_VERSION, ServerId, ServerRecord, TenantId};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::application::ports::{CreateError, CreateOutcome, ServerDraft, ServerStore};
use crate::domain::{PortAllocator, PortError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    next_id: ServerId,
    #[serde(default)]
    servers: BTreeMap<ServerId, ServerRecord>,
    /// Payment id → server created for it.
    #[serde(default)]
    processed_payments: BTreeMap<String, ServerId>,
}

impl StoreDocument {
    fn max_port(&self) -> Option<u16> {
        self.servers.values().map(|s| s.port).max()
    }
}

/// File-backed server record store.
pub struct JsonServerStore {
    path: PathBuf,
    doc: Mutex<StoreDocument>,
}

impl JsonServerStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let load_path = path.clone();
        let doc = tokio::task::spawn_blocking(move || load_sync(&load_path))
            .await
            .context("store load task panicked")??;
        tracing::debug!(path = %path.display(), servers = doc.servers.len(), "server store opened");
        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    async fn persist(&self, doc: &StoreDocument) -> Result<()> {
        let path = self.path.clone();
        let doc = doc.clone();
        tokio::task::spawn_blocking(move || save_sync(&path, &doc))
            .await
            .context("store save task panicked")?
    }
}

fn load_sync(path: &Path) -> Result<StoreDocument> {
    if !path.exists() {
        return Ok(StoreDocument::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading server store {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing server store {}", path.display()))
}

fn save_sync(path: &Path, doc: &StoreDocument) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(doc).context("serializing server store")?;

    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, &content)
        .with_context(|| format!("writing temp file {}", temp_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
    }

    std::fs::rename(&temp_path, path)
        .with_context(|| format!("finalizing server store {}", path.display()))?;
    Ok(())
}

#[async_trait]
impl ServerStore for JsonServerStore {
    async fn create(
        &self,
        draft: ServerDraft,
        allocator: PortAllocator,
    ) -> Result<CreateOutcome, CreateError> {
        let mut doc = self.doc.lock().await;
        if let Some(&server_id) = draft
            .payment_id
            .as_ref()
            .and_then(|payment| doc.processed_payments.get(payment))
        {
            return Ok(CreateOutcome::AlreadyProcessed { server_id });
        }

        let port = allocator.next_port(doc.max_port())?;
        if doc.servers.values().any(|s| s.port == port) {
            return Err(PortError::Taken(port).into());
        }

        let mut next = doc.clone();
        next.next_id += 1;
        let record = ServerRecord {
            id: next.next_id,
            owner: draft.owner,
            port,
            plan_type: draft.plan_type,
            is_active: false,
            cpu_cores: draft.plan.cpu_cores,
            mem_limit: draft.plan.mem_limit,
            storage: draft.plan.storage,
            backup_type: draft.plan.backup_type,
            container_ref: None,
            world_data_path: None,
            version: DEFAULT_VERSION.to_string(),
            mods: String::new(),
            created_at: Utc::now(),
        };
        next.servers.insert(record.id, record.clone());
        if let Some(payment) = draft.payment_id {
            next.processed_payments.insert(payment, record.id);
        }

        self.persist(&next).await?;
        *doc = next;
        Ok(CreateOutcome::Created(record))
    }

    async fn get(&self, id: ServerId) -> Result<Option<ServerRecord>> {
        Ok(self.doc.lock().await.servers.get(&id).cloned())
    }

    async fn list(&self, owner: Option<TenantId>) -> Result<Vec<ServerRecord>> {
        let doc = self.doc.lock().await;
        Ok(doc
            .servers
            .values()
            .filter(|s| owner.is_none_or(|o| s.owner == o))
            .cloned()
            .collect())
    }

    async fn save(&self, record: &ServerRecord) -> Result<()> {
        let mut doc = self.doc.lock().await;
        if !doc.servers.contains_key(&record.id) {
            anyhow::bail!("server {} does not exist", record.id);
        }
        let mut next = doc.clone();
        next.servers.insert(record.id, record.clone());
        self.persist(&next).await?;
        *doc = next;
        Ok(())
    }

    async fn delete(&self, id: ServerId) -> Result<bool> {
        let mut doc = self.doc.lock().await;
        if !doc.servers.contains_key(&id) {
            return Ok(false);
        }
        let mut next = doc.clone();
        next.servers.remove(&id);
        self.persist(&next).await?;
        *doc = next;
        Ok(true)
    }
}
