//! Application context and composition root.
//!
//! `Services::from_config` is the single place where concrete adapters are
//! constructed and wired into the application services. Both `mchost serve`
//! and the operator subcommands go through it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use mchost_common::{FirewallKind, HostConfig};

use crate::application::ports::{FirewallBackend, RouterGateway, ServerStore, WorldStorage};
use crate::application::services::{
    ContainerRuntime, LifecycleController, NetworkExposureManager, ProvisioningIntake,
    RecordLocks, WorldUploads,
};
use crate::domain::PortAllocator;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::docker::BollardEngine;
use crate::infra::firewall::{NetshFirewall, UfwFirewall};
use crate::infra::store::JsonServerStore;
use crate::infra::upnp::IgdGateway;
use crate::infra::world_archive::ZipWorldStorage;
use crate::output::OutputContext;

/// Environment variable prefix for [`HostConfig`] fields.
pub const ENV_PREFIX: &str = "MCHOST_";

/// Load host configuration from `MCHOST_*` environment variables.
///
/// # Errors
///
/// Returns an error if a variable is present but malformed.
pub fn load_config() -> Result<HostConfig> {
    envy::prefixed(ENV_PREFIX)
        .from_env::<HostConfig>()
        .context("failed to load config from MCHOST_* env vars")
}

/// Application services wired to their production adapters.
#[derive(Clone)]
pub struct Services {
    pub lifecycle: LifecycleController,
    pub intake: ProvisioningIntake,
    pub worlds: WorldUploads,
}

impl Services {
    /// Open the store and construct every adapter named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened, the firewall flavour
    /// is unknown, or the Docker client cannot be configured.
    pub async fn from_config(config: &HostConfig) -> Result<Self> {
        let store: Arc<dyn ServerStore> = Arc::new(
            JsonServerStore::open(config.store_path())
                .await
                .context("opening server store")?,
        );

        let command_timeout = Duration::from_secs(config.command_timeout_secs);
        let firewall: Option<Arc<dyn FirewallBackend>> =
            match config.firewall_kind().map_err(anyhow::Error::msg)? {
                FirewallKind::Netsh => Some(Arc::new(NetshFirewall::new(TokioCommandRunner::new(
                    command_timeout,
                )))),
                FirewallKind::Ufw => Some(Arc::new(UfwFirewall::new(TokioCommandRunner::new(
                    command_timeout,
                )))),
                FirewallKind::Disabled => None,
            };
        let gateway: Option<Arc<dyn RouterGateway>> = config.upnp_enabled.then(|| {
            Arc::new(IgdGateway::new(Duration::from_millis(config.upnp_timeout_ms)))
                as Arc<dyn RouterGateway>
        });
        let engine = Arc::new(BollardEngine::connect(Duration::from_secs(
            config.stop_timeout_secs,
        ))?);
        let world_storage: Arc<dyn WorldStorage> = Arc::new(ZipWorldStorage::new(
            &config.worlds_dir(),
            config.max_world_extracted_bytes,
        )?);
        let locks = Arc::new(RecordLocks::new());

        tracing::info!(
            store = %config.store_path().display(),
            firewall = %config.firewall,
            upnp = config.upnp_enabled,
            base_port = config.base_port,
            "services configured"
        );

        Ok(Self {
            lifecycle: LifecycleController::new(
                Arc::clone(&store),
                NetworkExposureManager::new(firewall, gateway),
                ContainerRuntime::new(engine, Arc::clone(&world_storage)),
                Arc::clone(&locks),
            ),
            intake: ProvisioningIntake::new(Arc::clone(&store), PortAllocator::new(config.base_port)),
            worlds: WorldUploads::new(store, world_storage, locks, config.max_world_upload_bytes),
        })
    }
}

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub no_color: bool,
    pub quiet: bool,
    pub json: bool,
    /// Skip interactive prompts (also set by `CI` / `MCHOST_YES` env vars).
    pub yes: bool,
}

/// Unified context passed to every operator command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    pub config: HostConfig,
    /// When `true`, skip interactive prompts and use defaults.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("MCHOST_YES").is_ok();
        let mode = if flags.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        Ok(Self {
            output: OutputContext::new(flags.no_color, flags.quiet),
            mode,
            config: load_config()?,
            non_interactive: flags.yes || ci_env,
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true`, returns `default` immediately
    /// without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
