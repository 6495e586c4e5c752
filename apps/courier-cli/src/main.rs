//! Courier terminal client entry point.

mod app;
mod config;
mod input;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use courier_connection::Environment;

#[derive(Parser, Debug)]
#[command(name = "courier", about = "Chat over the Courier message socket")]
struct Cli {
    /// Origin of the web app (overrides the config file).
    #[arg(long, env = "COURIER_ORIGIN")]
    origin: Option<String>,

    /// Connect to the local development server.
    #[arg(long)]
    dev: bool,

    /// Bearer credential sent with the socket handshake.
    #[arg(long, env = "COURIER_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Default recipient for typed lines.
    #[arg(long = "to")]
    recipient: Option<u64>,

    /// Config file to use instead of the platform default.
    #[arg(long, env = "COURIER_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting courier");

    let mut config = match &cli.config {
        Some(path) => config::ClientConfig::load_from(path)?,
        None => config::ClientConfig::load()?,
    };
    if let Some(origin) = &cli.origin {
        config.origin.clone_from(origin);
    }
    if cli.dev {
        config.environment = Environment::Development;
    }
    if cli.recipient.is_some() {
        config.recipient = cli.recipient;
    }
    tracing::info!(origin = %config.origin, environment = ?config.environment, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config, cli.token))?;

    tracing::info!("courier shut down cleanly");
    Ok(())
}
