//! diagrams-preview - live preview for Python diagrams scripts
//!
//! Rewrites the script's `with Diagram(...)` call to write into a managed
//! directory, runs it, and shows the resulting image as an HTML page that is
//! regenerated on every save.

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use diagrams_preview::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Watch { file, open } => {
            let config = Config::load(config_path)?;
            cli::watch_document(config, &file, open).await?;
        }
        Commands::Render { file, out } => {
            let config = Config::load(config_path)?;
            cli::render_document(config, &file, out).await?;
        }
        Commands::Transform { file, stem } => {
            let config = Config::load(config_path)?;
            cli::transform_file(&config, &file, stem)?;
        }
        Commands::Config { key, value } => {
            cli::manage_config(config_path, key, value)?;
        }
    }

    Ok(())
}
