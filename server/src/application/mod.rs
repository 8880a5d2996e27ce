//! Application layer — port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain` — never on `crate::infra`,
//! `crate::api`, `crate::commands`, or `crate::output`.

pub mod ports;
pub mod services;

pub use ports::{
    CommandRunner, ContainerEngine, CreateError, CreateOutcome, EngineError, ExtractError,
    FirewallBackend, FirewallRule, GatewayError, RouterGateway, RouterSession, ServerDraft,
    ServerStore, WorldStorage,
};
