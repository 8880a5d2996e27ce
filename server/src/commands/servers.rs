//! Operator subcommands acting on server records.
//!
//! These run with operator authority against the same store and adapters as
//! `mchost serve`, so they must not be used while a server process holds the
//! store open.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use mchost_common::{
    CreateServerRequest, OperationReport, PlanType, ServerId, SettingsUpdate, TenantId,
};

use crate::app::{AppContext, Services};
use crate::application::services::Actor;
use crate::domain::LifecycleError;
use crate::output::json;

/// Arguments for `mchost list`.
#[derive(Args)]
pub struct ListArgs {
    /// Only show servers owned by this tenant
    #[arg(long)]
    pub owner: Option<TenantId>,
}

/// Arguments for commands that target one server.
#[derive(Args)]
pub struct IdArgs {
    /// Server id
    pub id: ServerId,
}

/// Arguments for `mchost create`.
#[derive(Args)]
pub struct CreateArgs {
    /// Tenant that will own the server
    #[arg(long)]
    pub owner: TenantId,

    /// Plan type
    #[arg(long, value_enum)]
    pub plan: PlanType,

    /// CPU label, e.g. "4 vCPU" (default: 2 vCPU)
    #[arg(long)]
    pub cpu: Option<String>,

    /// RAM label, e.g. "8 GB" (default: 2 GB)
    #[arg(long)]
    pub ram: Option<String>,

    /// Storage label
    #[arg(long)]
    pub storage: Option<String>,

    /// Backup plan label
    #[arg(long)]
    pub backup: Option<String>,
}

/// Arguments for `mchost settings`.
#[derive(Args)]
pub struct SettingsArgs {
    /// Server id
    pub id: ServerId,

    /// Game version, e.g. 1.20.4 or LATEST
    #[arg(long)]
    pub version: String,

    /// Comma-separated CurseForge mods: ids, slugs or `slug:fileId` (empty for vanilla)
    #[arg(long, default_value = "")]
    pub mods: String,
}

/// Arguments for `mchost upload-world`.
#[derive(Args)]
pub struct UploadWorldArgs {
    /// Server id
    pub id: ServerId,

    /// Path to a zip archive containing level.dat
    pub archive: PathBuf,
}

fn render(app: &AppContext, result: Result<OperationReport, LifecycleError>) -> Result<()> {
    let report = result?;
    if app.is_json() {
        return json::print(&report);
    }
    app.output.report(&report);
    Ok(())
}

/// Run `mchost list`.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub async fn list(app: &AppContext, args: &ListArgs) -> Result<()> {
    let services = Services::from_config(&app.config).await?;
    let actor = args.owner.map_or(Actor::Operator, Actor::Tenant);
    let servers = services.lifecycle.list(actor).await?;
    if app.is_json() {
        return json::print(&servers);
    }
    app.output.servers(&servers);
    Ok(())
}

/// Run `mchost create`.
///
/// # Errors
///
/// Returns an error if the plan labels are invalid or the record cannot be stored.
pub async fn create(app: &AppContext, args: &CreateArgs) -> Result<()> {
    let services = Services::from_config(&app.config).await?;
    let request = CreateServerRequest {
        owner: args.owner,
        plan_type: args.plan.tag().to_string(),
        cpu: args.cpu.clone(),
        ram: args.ram.clone(),
        storage: args.storage.clone(),
        backup: args.backup.clone(),
    };
    let record = services.intake.create_for_operator(&request).await?;
    if app.is_json() {
        return json::print(&record);
    }
    app.output.success(&format!("Server {} created.", record.id));
    app.output.kv("Owner:", &record.owner.to_string());
    app.output.kv("Port: ", &record.port.to_string());
    app.output.kv("Plan: ", &record.plan_type.to_string());
    Ok(())
}

/// Run `mchost start <id>`.
///
/// # Errors
///
/// Returns an error if the server cannot be started.
pub async fn start(app: &AppContext, args: &IdArgs) -> Result<()> {
    let services = Services::from_config(&app.config).await?;
    render(app, services.lifecycle.start(Actor::Operator, args.id).await)
}

/// Run `mchost stop <id>`.
///
/// # Errors
///
/// Returns an error if the server does not exist or cannot be persisted.
pub async fn stop(app: &AppContext, args: &IdArgs) -> Result<()> {
    let services = Services::from_config(&app.config).await?;
    render(app, services.lifecycle.stop(Actor::Operator, args.id).await)
}

/// Run `mchost delete <id>`.
///
/// # Errors
///
/// Returns an error if the server does not exist or cannot be removed.
pub async fn delete(app: &AppContext, args: &IdArgs) -> Result<()> {
    if !app.confirm(&format!("Permanently delete server {}?", args.id), false)? {
        app.output.info("Cancelled.");
        return Ok(());
    }
    let services = Services::from_config(&app.config).await?;
    render(app, services.lifecycle.delete(Actor::Operator, args.id).await)
}

/// Run `mchost settings <id>`.
///
/// # Errors
///
/// Returns an error if the settings are rejected.
pub async fn settings(app: &AppContext, args: &SettingsArgs) -> Result<()> {
    let services = Services::from_config(&app.config).await?;
    let update = SettingsUpdate {
        version: args.version.clone(),
        mods: args.mods.clone(),
    };
    render(
        app,
        services
            .lifecycle
            .update_settings(Actor::Operator, args.id, &update)
            .await,
    )
}

/// Run `mchost upload-world <id> <archive>`.
///
/// # Errors
///
/// Returns an error if the archive cannot be read or is rejected.
pub async fn upload_world(app: &AppContext, args: &UploadWorldArgs) -> Result<()> {
    let bytes = tokio::fs::read(&args.archive)
        .await
        .with_context(|| format!("reading {}", args.archive.display()))?;
    let filename = args
        .archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let services = Services::from_config(&app.config).await?;
    render(
        app,
        services
            .worlds
            .upload(Actor::Operator, args.id, &filename, bytes)
            .await,
    )
}
