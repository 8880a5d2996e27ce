pub mod config;
pub mod plan;
pub mod types;

pub use config::{FirewallKind, HostConfig};
pub use plan::{PlanError, PlanSpec, leading_integer};
pub use types::*;
