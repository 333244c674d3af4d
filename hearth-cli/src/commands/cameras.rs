//! Cameras command

use anyhow::{Context, Result};
use hearth_core::capture::create_backend;
use std::path::Path;

/// List attached cameras for the configured backend
pub async fn cameras(config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let backend = create_backend(config.camera.backend)?;

    println!("Hearth - Cameras ({} backend)\n", backend.name());

    let devices = backend.list_devices().context("Failed to enumerate cameras")?;
    if devices.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("{:<24} {:<36} {:<12}", "ID", "Name", "Position");
    println!("{}", "-".repeat(72));

    for device in devices {
        let marker = if config.camera.device.as_deref() == Some(device.id.as_str()) {
            " (configured)"
        } else {
            ""
        };
        println!(
            "{:<24} {:<36} {}{}",
            device.id,
            truncate(&device.name, 34),
            device.position,
            marker
        );
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
