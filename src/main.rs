use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

mod api;
mod cli;
mod command;
mod config;
mod domain;
mod selection;
mod session;
mod size_scale;

use cli::{Cli, Commands};
use command::{run_examples, run_ingest, run_interactive, run_size, run_stars};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref(), cli.overrides())?;
    debug!("Resolved config: {:?}", config);

    match cli.command {
        Some(Commands::Ingest(args)) => run_ingest(&config, args).await?,
        Some(Commands::Interactive) | None => run_interactive(&config).await?,
        Some(Commands::Examples) => run_examples().await?,
        Some(Commands::Stars) => run_stars(&config).await?,
        Some(Commands::Size { position, kb }) => run_size(position, kb).await?,
    }

    Ok(())
}
