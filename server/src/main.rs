//! mchost - per-tenant game server provisioning host

use clap::Parser;
use mchost_server::cli::Cli;
use mchost_server::commands::error_code;
use mchost_server::output::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = cli.run().await {
        match json::format_error(&format!("{e:#}"), error_code(&e)) {
            Ok(body) if json_mode => println!("{body}"),
            _ => eprintln!("Error: {e:#}"),
        }
        std::process::exit(1);
    }
}
