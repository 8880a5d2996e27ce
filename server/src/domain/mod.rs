//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod container;
pub mod error;
pub mod port_allocator;
pub mod settings;

pub use container::{
    ContainerSpec, ContainerSpecError, PortMapping, ServerFlavor, VolumeBind, container_name,
};
pub use error::{IntakeError, LifecycleError, PortError, WorldUploadError};
pub use port_allocator::PortAllocator;
pub use settings::{normalize_mods, validate_settings};
