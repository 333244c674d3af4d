//! Serve command - run the HTTP control plane

use anyhow::{Context, Result};
use clap::Args;
use hearth_core::config::ServerConfig;
use hearth_core::server::{HomeServer, shutdown_signal};
use std::net::IpAddr;
use std::path::Path;
use tracing::{info, warn};

/// Arguments for the serve command
#[derive(Args, Default)]
pub struct ServeArgs {
    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides the config file)
    #[arg(short, long)]
    bind: Option<IpAddr>,

    /// API key clients must send in X-API-Key
    #[arg(long, env = "HEARTH_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Hide internal error details from clients
    #[arg(long)]
    release: bool,
}

/// Run the server until Ctrl+C
pub async fn serve(args: ServeArgs, config_path: Option<&Path>) -> Result<()> {
    let file = super::load_config(config_path)?;
    let mut config = ServerConfig::from_file(&file).context("Invalid configuration")?;

    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if let Some(bind) = args.bind {
        config = config.with_bind(bind);
    }
    if let Some(key) = args.api_key.filter(|k| !k.trim().is_empty()) {
        config = config.with_api_key(key);
    }
    if args.release {
        config = config.with_release_mode(true);
    }

    if config.api_key_generated {
        warn!(
            "No API key configured, generated one for this run: {}",
            config.api_key
        );
    }

    let server = HomeServer::from_config(config).context("Failed to set up services")?;
    let status = server.status();
    info!(
        "Camera backend: {}, authorized keys: {}",
        status.camera.backend,
        server.state().remote.key_count()
    );
    println!("Hearth listening on http://{}", server.config().socket_addr());
    println!("Press Ctrl+C to stop.");

    server.serve(shutdown_signal()).await?;
    println!("Stopped.");
    Ok(())
}
