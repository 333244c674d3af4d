//! Hearth CLI
//!
//! Camera streaming and remote-access control plane for a home server.
//!
//! # Usage
//!
//! ```bash
//! # Run the HTTP API (default command)
//! hearth serve --port 8080
//!
//! # List attached cameras
//! hearth cameras
//!
//! # Manage authorized keys
//! hearth keys add --file ~/.ssh/id_ed25519.pub --comment laptop
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Hearth - home-server camera streaming and remote access
#[derive(Parser)]
#[command(name = "hearth")]
#[command(author = "GhostKellz")]
#[command(version)]
#[command(about = "Home-server camera streaming and remote-access control plane", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: ~/.config/hearth/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run (defaults to `serve`)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP control plane
    Serve(commands::ServeArgs),

    /// List attached cameras
    #[command(alias = "ls")]
    Cameras,

    /// Manage authorized keys
    Keys(commands::KeysArgs),

    /// Show or create the configuration file
    Config(commands::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("hearth={}", level).parse()?)
        .add_directive(format!("hearth_core={}", level).parse()?)
        .add_directive(format!("tower_http={}", level).parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = cli.config.as_deref();

    // Run the appropriate command
    match cli.command.unwrap_or_else(|| Commands::Serve(commands::ServeArgs::default())) {
        Commands::Serve(args) => commands::serve(args, config).await?,
        Commands::Cameras => commands::cameras(config).await?,
        Commands::Keys(args) => commands::keys(args, config).await?,
        Commands::Config(args) => commands::config(args, config).await?,
    }

    Ok(())
}
