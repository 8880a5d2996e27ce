use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Host firewall flavour used for local port exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirewallKind {
    /// Windows `netsh advfirewall`.
    Netsh,
    /// Ubuntu `ufw`.
    Ufw,
    /// Leave the host firewall alone (exposure handled elsewhere).
    Disabled,
}

impl FromStr for FirewallKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "netsh" => Ok(FirewallKind::Netsh),
            "ufw" => Ok(FirewallKind::Ufw),
            "disabled" | "none" | "off" => Ok(FirewallKind::Disabled),
            other => Err(format!(
                "unknown firewall '{other}' (expected netsh, ufw or disabled)"
            )),
        }
    }
}

/// Provisioning host configuration.
///
/// Loaded from `MCHOST_*` environment variables by the server binary; every
/// field has a default so an empty environment is a valid configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    /// HTTP listen address (default: 127.0.0.1:8000)
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Directory holding `servers.json` and uploaded worlds (default: ./data)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// First port handed out when no servers exist (default: 25565)
    #[serde(default = "default_base_port")]
    pub base_port: u16,

    /// Firewall flavour: netsh, ufw or disabled
    #[serde(default = "default_firewall")]
    pub firewall: String,

    /// Whether to request router port mappings over UPnP (default: true)
    #[serde(default = "default_true")]
    pub upnp_enabled: bool,

    /// UPnP gateway discovery budget in milliseconds (default: 2000)
    #[serde(default = "default_upnp_timeout_ms")]
    pub upnp_timeout_ms: u64,

    /// Ceiling for a single firewall command in seconds (default: 30)
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// Grace period given to a container before it is killed (default: 10)
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,

    /// Largest accepted world archive in bytes (default: 512 MiB)
    #[serde(default = "default_max_world_upload_bytes")]
    pub max_world_upload_bytes: usize,

    /// Largest total size a world archive may unpack to (default: 8 GiB)
    #[serde(default = "default_max_world_extracted_bytes")]
    pub max_world_extracted_bytes: u64,

    /// Bearer token for the operator create endpoint; endpoint disabled when unset
    #[serde(default)]
    pub operator_token: Option<String>,
}

impl HostConfig {
    /// Parsed firewall flavour.
    ///
    /// # Errors
    ///
    /// Returns the parse message when `firewall` names an unknown flavour.
    pub fn firewall_kind(&self) -> Result<FirewallKind, String> {
        self.firewall.parse()
    }

    /// Path of the server record document.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("servers.json")
    }

    /// Root directory for extracted world uploads.
    #[must_use]
    pub fn worlds_dir(&self) -> PathBuf {
        self.data_dir.join("worlds")
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_base_port() -> u16 {
    25565
}

fn default_firewall() -> String {
    if cfg!(windows) { "netsh" } else { "ufw" }.to_string()
}

fn default_true() -> bool {
    true
}

fn default_upnp_timeout_ms() -> u64 {
    2000
}

fn default_command_timeout_secs() -> u64 {
    30
}

fn default_stop_timeout_secs() -> u64 {
    10
}

fn default_max_world_upload_bytes() -> usize {
    512 * 1024 * 1024
}

fn default_max_world_extracted_bytes() -> u64 {
    8 * 1024 * 1024 * 1024
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            data_dir: default_data_dir(),
            base_port: default_base_port(),
            firewall: default_firewall(),
            upnp_enabled: default_true(),
            upnp_timeout_ms: default_upnp_timeout_ms(),
            command_timeout_secs: default_command_timeout_secs(),
            stop_timeout_secs: default_stop_timeout_secs(),
            max_world_upload_bytes: default_max_world_upload_bytes(),
            max_world_extracted_bytes: default_max_world_extracted_bytes(),
            operator_token: None,
        }
    }
}
