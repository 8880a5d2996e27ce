use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identity of a server record, assigned by the store.
pub type ServerId = u64;

/// Identity of the tenant that owns a server record.
pub type TenantId = u64;

/// Purchased product variant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum PlanType {
    #[serde(rename = "java")]
    #[cfg_attr(feature = "clap", value(name = "java"))]
    Java,
    #[serde(rename = "be")]
    #[cfg_attr(feature = "clap", value(name = "be"))]
    Bedrock,
    #[serde(rename = "web")]
    #[cfg_attr(feature = "clap", value(name = "web"))]
    WebHosting,
}

impl PlanType {
    /// Stored tag for this plan (`java`, `be`, `web`).
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            PlanType::Java => "java",
            PlanType::Bedrock => "be",
            PlanType::WebHosting => "web",
        }
    }

    /// Transport protocol the plan's game port speaks.
    #[must_use]
    pub fn protocol(self) -> Protocol {
        match self {
            PlanType::Bedrock => Protocol::Udp,
            PlanType::Java | PlanType::WebHosting => Protocol::Tcp,
        }
    }

    /// Whether the plan maps to a startable container.
    #[must_use]
    pub fn is_compute(self) -> bool {
        !matches!(self, PlanType::WebHosting)
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlanType::Java => "Java Edition",
            PlanType::Bedrock => "Bedrock Edition",
            PlanType::WebHosting => "Web Hosting",
        };
        f.write_str(label)
    }
}

/// Error returned when a plan tag is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown plan type '{0}' (expected java, be or web)")]
pub struct UnknownPlanType(pub String);

impl FromStr for PlanType {
    type Err = UnknownPlanType;

    /// Accepts the stored tags plus the aliases the checkout flow emits
    /// (`mc` for the game plan, `bedrock` spelled out).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "java" | "mc" => Ok(PlanType::Java),
            "be" | "bedrock" => Ok(PlanType::Bedrock),
            "web" => Ok(PlanType::WebHosting),
            _ => Err(UnknownPlanType(s.to_string())),
        }
    }
}

/// Transport protocol of an exposed port
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }

    /// Lowercase form used in container port keys (`25565/tcp`).
    #[must_use]
    pub fn as_lower(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted desired/actual state of one provisioned server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerRecord {
    pub id: ServerId,
    pub owner: TenantId,
    pub port: u16,
    pub plan_type: PlanType,
    pub is_active: bool,
    pub cpu_cores: u32,
    /// Memory ceiling in container notation, e.g. `"8g"`.
    pub mem_limit: String,
    #[serde(default)]
    pub storage: String,
    #[serde(default)]
    pub backup_type: String,
    /// Handle of the running container; `None` while inactive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_ref: Option<String>,
    /// Extracted world root from the last accepted upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_data_path: Option<PathBuf>,
    #[serde(default = "default_version")]
    pub version: String,
    /// Comma-separated CurseForge mods (ids, slugs or `slug:fileId`); empty for vanilla.
    #[serde(default)]
    pub mods: String,
    pub created_at: DateTime<Utc>,
}

/// Server version used until the owner picks one.
pub const DEFAULT_VERSION: &str = "LATEST";

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

impl ServerRecord {
    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.plan_type.protocol()
    }

    /// Clear runtime state after the backing container is gone.
    pub fn mark_inactive(&mut self) {
        self.is_active = false;
        self.container_ref = None;
    }

    /// Record a freshly started container.
    pub fn mark_active(&mut self, container_ref: String) {
        self.is_active = true;
        self.container_ref = Some(container_ref);
    }
}

/// Result of a caller-facing operation: a success flag plus a message the
/// UI can show verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationReport {
    pub success: bool,
    pub message: String,
    /// Soft failures that did not stop the operation (e.g. UPnP unavailable).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl OperationReport {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

// ── Payment provider wire types ──────────────────────────────────────────────

/// Event type emitted when a payment completes.
pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

/// Event type emitted when a payment attempt fails.
pub const PAYMENT_FAILED: &str = "payment_intent.payment_failed";

/// Payment provider event as delivered to the webhook (already verified).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: PaymentEventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEventData {
    pub object: PaymentObject,
}

/// The payment object carried by an event. Metadata is the string-keyed map
/// attached at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentObject {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Body of the settings-update operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub version: String,
    #[serde(default)]
    pub mods: String,
}

/// Body of the operator create operation. Size fields are free-form plan
/// strings such as `"4 vCPU"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServerRequest {
    pub owner: TenantId,
    pub plan_type: String,
    #[serde(default)]
    pub cpu: Option<String>,
    #[serde(default)]
    pub ram: Option<String>,
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(default)]
    pub backup: Option<String>,
}
