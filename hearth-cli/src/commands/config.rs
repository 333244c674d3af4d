//! Config command - show or create the configuration file

use anyhow::{Context, Result};
use clap::Args;
use hearth_core::config::{ConfigFile, sample_config};
use std::path::Path;

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Write a commented sample config file
    #[arg(long)]
    pub init: bool,

    /// Overwrite an existing file with --init
    #[arg(short, long, requires = "init")]
    pub force: bool,

    /// Print the config file path
    #[arg(long, conflicts_with = "init")]
    pub path: bool,

    /// Print the sample configuration to stdout
    #[arg(long, conflicts_with_all = ["init", "path"])]
    pub sample: bool,
}

/// Run config subcommand
pub async fn config(args: ConfigArgs, config_path: Option<&Path>) -> Result<()> {
    let path = super::config_path(config_path);

    if args.path {
        println!("{}", path.display());
        if path.exists() {
            println!("(file exists)");
        } else {
            println!("(file does not exist)");
        }
        return Ok(());
    }

    if args.sample {
        print!("{}", sample_config());
        return Ok(());
    }

    if args.init {
        if path.exists() && !args.force {
            println!("Configuration file already exists: {}", path.display());
            println!();
            println!("Use --force to overwrite, or edit the existing file.");
            return Ok(());
        }
        if args.force && path.exists() {
            std::fs::remove_file(&path).context("Failed to remove existing config file")?;
        }

        ConfigFile::create_sample_if_missing(&path)?;
        println!("Created configuration file: {}", path.display());
        println!();
        println!("Edit this file to customize Hearth settings.");
        return Ok(());
    }

    // Show the effective configuration
    let config = super::load_config(config_path)?;
    if path.exists() {
        println!("# Configuration file: {}\n", path.display());
    } else {
        println!("# No configuration file at {}, showing defaults\n", path.display());
    }
    let mut shown = config;
    if shown.server.api_key.is_some() {
        shown.server.api_key = Some("********".to_string());
    }
    print!(
        "{}",
        toml::to_string_pretty(&shown).context("Failed to render configuration")?
    );
    Ok(())
}
