//! Application services — use-case orchestration.
//!
//! Each service composes domain logic with port trait calls. Services import
//! only from `crate::domain` and `crate::application::ports` — never from
//! `crate::infra`, `crate::api`, or `crate::commands`.

pub mod exposure;
pub mod intake;
pub mod lifecycle;
pub mod locks;
pub mod runtime;
pub mod world;

#[cfg(test)]
pub(crate) mod test_support;

pub use exposure::{ExternalExposure, NetworkExposureManager};
pub use intake::{IntakeOutcome, ProvisioningIntake};
pub use lifecycle::{Actor, LifecycleController};
pub use locks::{RecordGuard, RecordLocks};
pub use runtime::{ContainerRuntime, RuntimeError, StopOutcome};
pub use world::WorldUploads;
