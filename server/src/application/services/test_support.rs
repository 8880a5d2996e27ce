//! In-memory port implementations shared by the service tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use mchost_common::{
    DEFAULT_VERSION, PaymentEvent, PaymentEventData, PaymentObject, PlanType, Protocol, ServerId,
    ServerRecord, TenantId,
};

use crate::application::ports::{
    ContainerEngine, CreateError, CreateOutcome, EngineError, ExtractError, FirewallBackend,
    FirewallRule, GatewayError, RouterGateway, RouterSession, ServerDraft, ServerStore,
    WorldStorage,
};
use crate::domain::{ContainerSpec, PortAllocator, PortError};

pub fn record(id: ServerId, owner: TenantId, port: u16, plan_type: PlanType) -> ServerRecord {
    ServerRecord {
        id,
        owner,
        port,
        plan_type,
        is_active: false,
        cpu_cores: 2,
        mem_limit: "2g".to_string(),
        storage: String::new(),
        backup_type: String::new(),
        container_ref: None,
        world_data_path: None,
        version: DEFAULT_VERSION.to_string(),
        mods: String::new(),
        created_at: Utc::now(),
    }
}

pub fn payment_event(payment_id: &str, event_type: &str, metadata: &[(&str, &str)]) -> PaymentEvent {
    PaymentEvent {
        id: format!("evt_{payment_id}"),
        event_type: event_type.to_string(),
        data: PaymentEventData {
            object: PaymentObject {
                id: payment_id.to_string(),
                metadata: metadata
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
            },
        },
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct StoreState {
    records: BTreeMap<ServerId, ServerRecord>,
    payments: HashMap<String, ServerId>,
    next_id: ServerId,
    fail_saves: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn insert(&self, record: ServerRecord) {
        let mut state = self.state.lock().unwrap();
        state.next_id = state.next_id.max(record.id);
        state.records.insert(record.id, record);
    }

    pub fn record(&self, id: ServerId) -> Option<ServerRecord> {
        self.state.lock().unwrap().records.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    pub fn fail_saves(&self) {
        self.state.lock().unwrap().fail_saves = true;
    }
}

#[async_trait]
impl ServerStore for MemoryStore {
    async fn create(
        &self,
        draft: ServerDraft,
        allocator: PortAllocator,
    ) -> Result<CreateOutcome, CreateError> {
        let mut state = self.state.lock().unwrap();
        if let Some(server_id) = draft.payment_id.as_ref().and_then(|p| state.payments.get(p)) {
            return Ok(CreateOutcome::AlreadyProcessed {
                server_id: *server_id,
            });
        }
        let max = state.records.values().map(|r| r.port).max();
        let port = allocator.next_port(max)?;
        if state.records.values().any(|r| r.port == port) {
            return Err(PortError::Taken(port).into());
        }
        state.next_id += 1;
        let mut server = record(state.next_id, draft.owner, port, draft.plan_type);
        server.cpu_cores = draft.plan.cpu_cores;
        server.mem_limit = draft.plan.mem_limit;
        server.storage = draft.plan.storage;
        server.backup_type = draft.plan.backup_type;
        if let Some(payment) = draft.payment_id {
            state.payments.insert(payment, server.id);
        }
        state.records.insert(server.id, server.clone());
        Ok(CreateOutcome::Created(server))
    }

    async fn get(&self, id: ServerId) -> Result<Option<ServerRecord>> {
        Ok(self.record(id))
    }

    async fn list(&self, owner: Option<TenantId>) -> Result<Vec<ServerRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .values()
            .filter(|r| owner.is_none_or(|o| r.owner == o))
            .cloned()
            .collect())
    }

    async fn save(&self, record: &ServerRecord) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_saves {
            anyhow::bail!("disk full");
        }
        let slot = state
            .records
            .get_mut(&record.id)
            .ok_or_else(|| anyhow::anyhow!("server {} does not exist", record.id))?;
        *slot = record.clone();
        Ok(())
    }

    async fn delete(&self, id: ServerId) -> Result<bool> {
        Ok(self.state.lock().unwrap().records.remove(&id).is_some())
    }
}

// ── Firewall ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FirewallState {
    open: HashSet<u16>,
    adds: usize,
    deletes: usize,
}

#[derive(Default)]
pub struct SpyFirewall {
    state: Mutex<FirewallState>,
    failing: bool,
}

impl SpyFirewall {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn is_open(&self, port: u16) -> bool {
        self.state.lock().unwrap().open.contains(&port)
    }

    pub fn adds(&self) -> usize {
        self.state.lock().unwrap().adds
    }

    pub fn deletes(&self) -> usize {
        self.state.lock().unwrap().deletes
    }
}

#[async_trait]
impl FirewallBackend for SpyFirewall {
    async fn rule_exists(&self, rule: &FirewallRule) -> Result<bool> {
        if self.failing {
            anyhow::bail!("firewall service not running");
        }
        Ok(self.is_open(rule.port))
    }

    async fn add_rule(&self, rule: &FirewallRule) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.adds += 1;
        state.open.insert(rule.port);
        Ok(())
    }

    async fn delete_rule(&self, rule: &FirewallRule) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.deletes += 1;
        state.open.remove(&rule.port);
        Ok(())
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct GatewayState {
    mappings: Vec<(u16, Protocol)>,
    removals: usize,
}

pub struct SpyGateway {
    present: bool,
    fail_remove: bool,
    state: Arc<Mutex<GatewayState>>,
}

impl Default for SpyGateway {
    fn default() -> Self {
        Self {
            present: true,
            fail_remove: false,
            state: Arc::default(),
        }
    }
}

impl SpyGateway {
    pub fn absent() -> Self {
        Self {
            present: false,
            ..Self::default()
        }
    }

    pub fn failing_removal() -> Self {
        Self {
            fail_remove: true,
            ..Self::default()
        }
    }

    pub fn preload(&self, port: u16, protocol: Protocol) {
        self.state.lock().unwrap().mappings.push((port, protocol));
    }

    pub fn mappings(&self) -> Vec<(u16, Protocol)> {
        self.state.lock().unwrap().mappings.clone()
    }

    pub fn removals(&self) -> usize {
        self.state.lock().unwrap().removals
    }
}

#[async_trait]
impl RouterGateway for SpyGateway {
    async fn connect(&self) -> Result<Box<dyn RouterSession>, GatewayError> {
        if !self.present {
            return Err(GatewayError::NotFound);
        }
        Ok(Box::new(SpySession {
            fail_remove: self.fail_remove,
            state: Arc::clone(&self.state),
        }))
    }
}

struct SpySession {
    fail_remove: bool,
    state: Arc<Mutex<GatewayState>>,
}

#[async_trait]
impl RouterSession for SpySession {
    fn lan_addr(&self) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10))
    }

    async fn remove_mapping(&self, port: u16, protocol: Protocol) -> Result<bool, GatewayError> {
        if self.fail_remove {
            return Err(GatewayError::Request("router refused".into()));
        }
        let mut state = self.state.lock().unwrap();
        state.removals += 1;
        let before = state.mappings.len();
        state.mappings.retain(|m| *m != (port, protocol));
        Ok(state.mappings.len() != before)
    }

    async fn add_mapping(
        &self,
        port: u16,
        protocol: Protocol,
        _lan_addr: IpAddr,
        _description: &str,
    ) -> Result<(), GatewayError> {
        self.state.lock().unwrap().mappings.push((port, protocol));
        Ok(())
    }
}

// ── Container engine ──────────────────────────────────────────────────────────

#[derive(Default)]
struct EngineState {
    /// (id, name) of running containers.
    containers: Vec<(String, String)>,
    counter: usize,
    runs: usize,
    stops: usize,
}

#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<EngineState>,
    fail_run: Option<String>,
    fail_stop: Option<String>,
}

impl FakeEngine {
    pub fn failing_run(reason: &str) -> Self {
        Self {
            fail_run: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn failing_stop(reason: &str) -> Self {
        Self {
            fail_stop: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// Names of running containers.
    pub fn running(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.containers.iter().map(|(_, name)| name.clone()).collect()
    }

    pub fn runs(&self) -> usize {
        self.state.lock().unwrap().runs
    }

    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn ensure_image(&self, _image: &str) -> Result<(), EngineError> {
        Ok(())
    }

    async fn run(&self, spec: &ContainerSpec) -> Result<String, EngineError> {
        let mut state = self.state.lock().unwrap();
        state.runs += 1;
        if let Some(reason) = &self.fail_run {
            return Err(EngineError::Api(reason.clone()));
        }
        state.counter += 1;
        let id = format!("ctr-{}", state.counter);
        state.containers.push((id.clone(), spec.name.clone()));
        Ok(id)
    }

    async fn stop_and_remove(&self, container_ref: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state.stops += 1;
        if let Some(reason) = &self.fail_stop {
            return Err(EngineError::Api(reason.clone()));
        }
        let before = state.containers.len();
        state
            .containers
            .retain(|(id, name)| id != container_ref && name != container_ref);
        if state.containers.len() == before {
            return Err(EngineError::NotFound(container_ref.to_string()));
        }
        Ok(())
    }
}

// ── World storage ─────────────────────────────────────────────────────────────

/// World storage that only answers `world_exists`.
pub struct StubWorlds {
    present: bool,
}

impl StubWorlds {
    pub fn new(present: bool) -> Self {
        Self { present }
    }
}

#[async_trait]
impl WorldStorage for StubWorlds {
    async fn prepare(&self, _server_id: ServerId) -> Result<PathBuf> {
        anyhow::bail!("not expected")
    }

    async fn extract(&self, _archive: Vec<u8>, _dest: &Path) -> Result<(), ExtractError> {
        Err(anyhow::anyhow!("not expected").into())
    }

    async fn find_marker(&self, _root: &Path, _marker: &str) -> Result<Option<PathBuf>> {
        anyhow::bail!("not expected")
    }

    async fn commit(
        &self,
        _server_id: ServerId,
        _staging: &Path,
        _world_root: &Path,
    ) -> Result<PathBuf> {
        anyhow::bail!("not expected")
    }

    async fn discard(&self, _dir: &Path) -> Result<()> {
        anyhow::bail!("not expected")
    }

    async fn world_exists(&self, _path: &Path) -> bool {
        self.present
    }
}

#[derive(Default)]
struct WorldsState {
    prepared: usize,
    committed: usize,
    discarded: Vec<PathBuf>,
}

#[derive(Clone, Copy)]
enum Unpack {
    Ok,
    Corrupt,
    Expands,
}

/// World storage rooted at `/worlds` that never touches disk.
pub struct FakeWorlds {
    unpack: Unpack,
    /// Subdirectory reported as holding the marker.
    marker_dir: Option<String>,
    state: Mutex<WorldsState>,
}

impl FakeWorlds {
    fn build(unpack: Unpack, marker_dir: Option<&str>) -> Self {
        Self {
            unpack,
            marker_dir: marker_dir.map(str::to_string),
            state: Mutex::default(),
        }
    }

    pub fn with_marker(dir: &str) -> Self {
        Self::build(Unpack::Ok, Some(dir))
    }

    pub fn without_marker() -> Self {
        Self::build(Unpack::Ok, None)
    }

    pub fn corrupt() -> Self {
        Self::build(Unpack::Corrupt, None)
    }

    /// Archive whose contents exceed a 4096 byte unpack limit.
    pub fn expanding() -> Self {
        Self::build(Unpack::Expands, None)
    }

    pub fn prepared(&self) -> usize {
        self.state.lock().unwrap().prepared
    }

    pub fn committed(&self) -> usize {
        self.state.lock().unwrap().committed
    }

    pub fn discarded(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().discarded.clone()
    }
}

#[async_trait]
impl WorldStorage for FakeWorlds {
    async fn prepare(&self, server_id: ServerId) -> Result<PathBuf> {
        self.state.lock().unwrap().prepared += 1;
        Ok(PathBuf::from(format!("/worlds/{server_id}.upload")))
    }

    async fn extract(&self, _archive: Vec<u8>, _dest: &Path) -> Result<(), ExtractError> {
        match self.unpack {
            Unpack::Ok => Ok(()),
            Unpack::Corrupt => Err(ExtractError::Corrupt),
            Unpack::Expands => Err(ExtractError::TooLarge { limit: 4096 }),
        }
    }

    async fn find_marker(&self, root: &Path, _marker: &str) -> Result<Option<PathBuf>> {
        Ok(self.marker_dir.as_ref().map(|dir| root.join(dir)))
    }

    async fn commit(
        &self,
        server_id: ServerId,
        staging: &Path,
        world_root: &Path,
    ) -> Result<PathBuf> {
        self.state.lock().unwrap().committed += 1;
        let relative = world_root.strip_prefix(staging)?;
        Ok(PathBuf::from(format!("/worlds/{server_id}")).join(relative))
    }

    async fn discard(&self, dir: &Path) -> Result<()> {
        self.state.lock().unwrap().discarded.push(dir.to_path_buf());
        Ok(())
    }

    async fn world_exists(&self, _path: &Path) -> bool {
        false
    }
}
