//! Translation of a server record into a container launch specification.
//!
//! Pure: the caller decides whether the world directory exists on the host
//! and passes the answer in.

use std::collections::BTreeMap;
use std::path::PathBuf;

use mchost_common::{PlanType, Protocol, ServerRecord};
use thiserror::Error;

/// Image for bedrock-edition servers.
pub const BEDROCK_IMAGE: &str = "itzg/minecraft-bedrock-server";
/// Image for java-edition servers, vanilla or modded.
pub const JAVA_IMAGE: &str = "itzg/minecraft-server";
/// Port the bedrock image listens on inside the container.
pub const BEDROCK_INTERNAL_PORT: u16 = 19132;
/// Port the java image listens on inside the container.
pub const JAVA_INTERNAL_PORT: u16 = 25565;
/// World directory inside the container.
pub const CONTAINER_WORLD_DIR: &str = "/data/world";

/// Java server distribution selected from the mod list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerFlavor {
    Vanilla,
    Modded,
}

impl ServerFlavor {
    /// Value of the image's `TYPE` variable.
    #[must_use]
    pub fn env_value(self) -> &'static str {
        match self {
            ServerFlavor::Vanilla => "VANILLA",
            ServerFlavor::Modded => "FORGE",
        }
    }
}

/// Host port → container port binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub container_port: u16,
    pub host_port: u16,
    pub protocol: Protocol,
}

impl PortMapping {
    /// Key in container-engine notation, e.g. `25565/tcp`.
    #[must_use]
    pub fn container_key(&self) -> String {
        format!("{}/{}", self.container_port, self.protocol.as_lower())
    }
}

/// Read-write bind mount from the host into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeBind {
    pub host_path: PathBuf,
    pub container_path: String,
}

impl VolumeBind {
    /// Bind in `host:container:rw` notation.
    #[must_use]
    pub fn to_bind_string(&self) -> String {
        format!("{}:{}:rw", self.host_path.display(), self.container_path)
    }
}

/// Everything the container engine needs to launch one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: &'static str,
    pub port: PortMapping,
    /// CPU quota in units of 10⁻⁹ CPUs.
    pub nano_cpus: i64,
    pub memory_bytes: i64,
    pub env: BTreeMap<String, String>,
    pub volume: Option<VolumeBind>,
    /// Set for java servers only.
    pub flavor: Option<ServerFlavor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerSpecError {
    #[error("{0} plans do not run in a container")]
    NotCompute(PlanType),

    #[error("memory limit '{0}' is not a valid size")]
    InvalidMemory(String),
}

/// Deterministic container name for a server port.
#[must_use]
pub fn container_name(port: u16) -> String {
    format!("mcserver_{port}")
}

impl ContainerSpec {
    /// Build the launch spec for `server`.
    ///
    /// `world_present` must be `true` only if the record's world path exists
    /// on the host; otherwise no volume is mounted.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerSpecError::NotCompute`] for web-hosting plans and
    /// [`ContainerSpecError::InvalidMemory`] for an unparseable memory limit.
    pub fn for_server(server: &ServerRecord, world_present: bool) -> Result<Self, ContainerSpecError> {
        let (image, container_port) = match server.plan_type {
            PlanType::Bedrock => (BEDROCK_IMAGE, BEDROCK_INTERNAL_PORT),
            PlanType::Java => (JAVA_IMAGE, JAVA_INTERNAL_PORT),
            PlanType::WebHosting => return Err(ContainerSpecError::NotCompute(server.plan_type)),
        };
        let memory_bytes = parse_mem_limit(&server.mem_limit)
            .ok_or_else(|| ContainerSpecError::InvalidMemory(server.mem_limit.clone()))?;

        let mut env = BTreeMap::new();
        env.insert("EULA".to_string(), "TRUE".to_string());
        env.insert("MEMORY".to_string(), server.mem_limit.clone());
        env.insert("VERSION".to_string(), server.version.clone());

        let flavor = (server.plan_type == PlanType::Java).then(|| {
            if server.mods.trim().is_empty() {
                ServerFlavor::Vanilla
            } else {
                ServerFlavor::Modded
            }
        });
        if let Some(flavor) = flavor {
            env.insert("TYPE".to_string(), flavor.env_value().to_string());
            if flavor == ServerFlavor::Modded {
                env.insert("CF_MODS".to_string(), server.mods.clone());
            }
        }

        let volume = match &server.world_data_path {
            Some(path) if world_present => {
                env.insert("WORLD".to_string(), CONTAINER_WORLD_DIR.to_string());
                Some(VolumeBind {
                    host_path: path.clone(),
                    container_path: CONTAINER_WORLD_DIR.to_string(),
                })
            }
            _ => None,
        };

        Ok(Self {
            name: container_name(server.port),
            image,
            port: PortMapping {
                container_port,
                host_port: server.port,
                protocol: server.protocol(),
            },
            nano_cpus: i64::from(server.cpu_cores) * 1_000_000_000,
            memory_bytes,
            env,
            volume,
            flavor,
        })
    }

    /// Environment in `KEY=value` form.
    #[must_use]
    pub fn env_pairs(&self) -> Vec<String> {
        self.env.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }
}

/// Parse a container memory size (`"8g"`, `"512m"`, `"1024k"`, `"2048"`).
#[must_use]
pub fn parse_mem_limit(limit: &str) -> Option<i64> {
    let limit = limit.trim().to_ascii_lowercase();
    let (digits, multiplier) = match limit.char_indices().last()? {
        (i, 'g') => (&limit[..i], 1024 * 1024 * 1024),
        (i, 'm') => (&limit[..i], 1024 * 1024),
        (i, 'k') => (&limit[..i], 1024),
        (_, 'b') => (limit.trim_end_matches('b'), 1),
        _ => (limit.as_str(), 1),
    };
    let value: i64 = digits.parse().ok()?;
    if value <= 0 {
        return None;
    }
    value.checked_mul(multiplier)
}
