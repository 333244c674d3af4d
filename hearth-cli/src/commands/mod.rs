//! CLI command implementations

mod cameras;
mod config;
mod keys;
mod serve;

pub use cameras::cameras;
pub use config::{ConfigArgs, config};
pub use keys::{KeysArgs, keys};
pub use serve::{ServeArgs, serve};

use anyhow::{Context, Result};
use hearth_core::config::ConfigFile;
use std::path::{Path, PathBuf};

/// Path of the config file in use
fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(ConfigFile::default_path)
}

/// Load the config file
///
/// An explicitly given file must parse; the default location falls back to
/// built-in defaults with a warning.
fn load_config(explicit: Option<&Path>) -> Result<ConfigFile> {
    match explicit {
        Some(path) => ConfigFile::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(ConfigFile::load_or_default()),
    }
}
