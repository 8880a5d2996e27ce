//! Infrastructure layer — concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, firewall
//! commands, UPnP, the container engine, record persistence and world
//! archive extraction.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::api`, `crate::commands` or `crate::output` are forbidden.

pub mod command_runner;
pub mod docker;
pub mod firewall;
pub mod store;
pub mod upnp;
pub mod world_archive;
