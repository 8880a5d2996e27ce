//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags};
use crate::commands;

/// Provision and run per-tenant game servers
#[derive(Parser)]
#[command(
    name = "mchost",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Skip confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server (tenant API, payment webhook, operator API)
    Serve,

    /// List servers
    List(commands::servers::ListArgs),

    /// Create a server without a payment
    Create(commands::servers::CreateArgs),

    /// Start or restart a server
    Start(commands::servers::IdArgs),

    /// Stop a server
    Stop(commands::servers::IdArgs),

    /// Stop a server and delete its record
    Delete(commands::servers::IdArgs),

    /// Change a server's version and mods
    Settings(commands::servers::SettingsArgs),

    /// Replace a server's world with a zip archive
    UploadWorld(commands::servers::UploadWorldArgs),
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            json,
            quiet,
            no_color,
            yes,
            command,
        } = self;
        let app = AppContext::new(&AppFlags {
            no_color,
            quiet,
            json,
            yes,
        })?;
        match command {
            Command::Serve => commands::serve::run(&app).await,
            Command::List(args) => commands::servers::list(&app, &args).await,
            Command::Create(args) => commands::servers::create(&app, &args).await,
            Command::Start(args) => commands::servers::start(&app, &args).await,
            Command::Stop(args) => commands::servers::stop(&app, &args).await,
            Command::Delete(args) => commands::servers::delete(&app, &args).await,
            Command::Settings(args) => commands::servers::settings(&app, &args).await,
            Command::UploadWorld(args) => commands::servers::upload_world(&app, &args).await,
        }
    }
}
