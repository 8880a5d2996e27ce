//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and the shared types crate —
//! never from `crate::infra`, `crate::api`, or `crate::commands`.
//!
//! Ports are object-safe (`async_trait`) so a single explicitly constructed
//! instance of each adapter can be shared behind an `Arc` by the HTTP layer
//! and the operator CLI.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::Output;

use anyhow::Result;
use async_trait::async_trait;
use mchost_common::{PlanSpec, PlanType, Protocol, ServerId, ServerRecord, TenantId};
use thiserror::Error;

use crate::domain::{ContainerSpec, PortAllocator, PortError};

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so firewall adapters can be swapped or mocked.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a program and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds the
    /// runner's timeout. A non-zero exit is reported through `Output::status`,
    /// not as an error.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
}

// ── Persistence Port ──────────────────────────────────────────────────────────

/// A server record about to be created.
#[derive(Debug, Clone)]
pub struct ServerDraft {
    pub owner: TenantId,
    pub plan_type: PlanType,
    pub plan: PlanSpec,
    /// Payment identifier used to deduplicate webhook redelivery.
    pub payment_id: Option<String>,
}

/// Result of [`ServerStore::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new record was inserted.
    Created(ServerRecord),
    /// The payment was already fulfilled by an earlier delivery.
    AlreadyProcessed { server_id: ServerId },
}

/// Errors raised by [`ServerStore::create`].
#[derive(Debug, Error)]
pub enum CreateError {
    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Persistence of server records.
#[async_trait]
pub trait ServerStore: Send + Sync {
    /// Allocate the next port and insert a new inactive record as one
    /// transaction. Concurrent calls never observe the same maximum port.
    async fn create(
        &self,
        draft: ServerDraft,
        allocator: PortAllocator,
    ) -> Result<CreateOutcome, CreateError>;

    /// Load a record by id.
    async fn get(&self, id: ServerId) -> Result<Option<ServerRecord>>;

    /// List records, optionally restricted to one owner, ordered by id.
    async fn list(&self, owner: Option<TenantId>) -> Result<Vec<ServerRecord>>;

    /// Overwrite an existing record.
    ///
    /// # Errors
    ///
    /// Returns an error if no record with that id exists.
    async fn save(&self, record: &ServerRecord) -> Result<()>;

    /// Permanently remove a record. Returns `false` if it did not exist.
    async fn delete(&self, id: ServerId) -> Result<bool>;
}

// ── Host Firewall Port ────────────────────────────────────────────────────────

/// An inbound allow rule for one port/protocol pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirewallRule {
    pub port: u16,
    pub protocol: Protocol,
}

impl FirewallRule {
    /// Deterministic rule name derived from the port.
    #[must_use]
    pub fn name(&self) -> String {
        format!("mchost port {}", self.port)
    }
}

/// Platform-specific host firewall commands.
#[async_trait]
pub trait FirewallBackend: Send + Sync {
    /// Whether an allow rule for `rule` is currently installed.
    async fn rule_exists(&self, rule: &FirewallRule) -> Result<bool>;
    /// Install the allow rule.
    async fn add_rule(&self, rule: &FirewallRule) -> Result<()>;
    /// Remove the allow rule.
    async fn delete_rule(&self, rule: &FirewallRule) -> Result<()>;
}

// ── Router Port ───────────────────────────────────────────────────────────────

/// Errors raised while talking to the LAN router.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("UPnP device (router) not found on the network")]
    NotFound,

    #[error("UPnP request failed: {0}")]
    Request(String),
}

/// Discovers the UPnP internet gateway on the local network.
#[async_trait]
pub trait RouterGateway: Send + Sync {
    /// Discover the gateway and open a session against it.
    async fn connect(&self) -> Result<Box<dyn RouterSession>, GatewayError>;
}

/// Port mapping operations against one discovered gateway.
#[async_trait]
pub trait RouterSession: Send + Sync {
    /// Host address on the LAN as seen from the gateway.
    fn lan_addr(&self) -> IpAddr;
    /// Remove a mapping. Returns `false` if none existed.
    async fn remove_mapping(&self, port: u16, protocol: Protocol) -> Result<bool, GatewayError>;
    /// Map `port` on the router to the same port on `lan_addr`.
    async fn add_mapping(
        &self,
        port: u16,
        protocol: Protocol,
        lan_addr: IpAddr,
        description: &str,
    ) -> Result<(), GatewayError>;
}

// ── Container Engine Port ─────────────────────────────────────────────────────

/// Errors raised by the container engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("container {0} not found")]
    NotFound(String),

    #[error("container engine error: {0}")]
    Api(String),
}

/// Container engine operations used by the runtime adapter.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Pull `image` unless it is already present locally.
    async fn ensure_image(&self, image: &str) -> Result<(), EngineError>;
    /// Create and start a detached container; returns its id.
    async fn run(&self, spec: &ContainerSpec) -> Result<String, EngineError>;
    /// Stop and remove a container by id or name.
    async fn stop_and_remove(&self, container_ref: &str) -> Result<(), EngineError>;
}

// ── World Storage Port ────────────────────────────────────────────────────────

/// Errors raised while unpacking an archive.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("archive is not a valid zip file")]
    Corrupt,

    #[error("archive unpacks to more than {limit} bytes")]
    TooLarge { limit: u64 },

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// Filesystem operations backing world uploads.
#[async_trait]
pub trait WorldStorage: Send + Sync {
    /// Create an empty staging directory for an upload to `server_id`.
    /// The currently accepted world is left in place.
    async fn prepare(&self, server_id: ServerId) -> Result<PathBuf>;
    /// Unpack a zip archive into `dest`.
    async fn extract(&self, archive: Vec<u8>, dest: &Path) -> Result<(), ExtractError>;
    /// Shallowest directory under `root` containing a file named `marker`.
    async fn find_marker(&self, root: &Path, marker: &str) -> Result<Option<PathBuf>>;
    /// Replace the accepted world of `server_id` with `staging` and return
    /// the new location of `world_root`, a directory inside `staging`.
    async fn commit(&self, server_id: ServerId, staging: &Path, world_root: &Path)
    -> Result<PathBuf>;
    /// Remove a staging directory and everything in it.
    async fn discard(&self, dir: &Path) -> Result<()>;
    /// Whether a previously extracted world is still on disk.
    async fn world_exists(&self, path: &Path) -> bool;
}
