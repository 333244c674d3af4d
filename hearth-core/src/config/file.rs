//! Configuration file loading
//!
//! Loads user configuration from `~/.config/hearth/config.toml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::capture::BackendKind;
use crate::error::{HearthError, Result};

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// HTTP control plane
    #[serde(default)]
    pub server: ServerSettings,

    /// Camera capture
    #[serde(default)]
    pub camera: CameraSettings,

    /// Stream sessions
    #[serde(default)]
    pub streams: StreamSettings,

    /// Remote-access listener
    #[serde(default)]
    pub ssh: SshSettings,
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address to bind
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret for the `X-API-Key` header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Hide internal error details from clients
    #[serde(default)]
    pub release_mode: bool,

    /// Build number reported by `/version`
    #[serde(default = "default_build_number")]
    pub build_number: String,
}

/// Camera settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Capture backend (synthetic, v4l2)
    #[serde(default)]
    pub backend: BackendKind,

    /// Device id to use instead of the backend default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    /// Capture width
    #[serde(default = "default_width")]
    pub width: u32,

    /// Capture height
    #[serde(default = "default_height")]
    pub height: u32,

    /// Capture frame rate
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Snapshot compression factor (0.0 - 1.0)
    #[serde(default = "default_snapshot_quality")]
    pub snapshot_quality: f64,
}

/// Stream session limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Highest frame rate a client may request
    #[serde(default = "default_max_frame_rate")]
    pub max_frame_rate: u32,
}

/// Remote-access listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SshSettings {
    /// Default listener port
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    /// Start the listener with the server
    #[serde(default)]
    pub autostart: bool,

    /// Bind a real TCP socket instead of bookkeeping only
    #[serde(default)]
    pub bind_listener: bool,

    /// Authorized-key file override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys_path: Option<PathBuf>,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_build_number() -> String {
    "1".to_string()
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

fn default_fps() -> u32 {
    30
}

fn default_snapshot_quality() -> f64 {
    0.9
}

fn default_max_frame_rate() -> u32 {
    60
}

fn default_ssh_port() -> u16 {
    crate::remote::DEFAULT_SSH_PORT
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            api_key: None,
            release_mode: false,
            build_number: default_build_number(),
        }
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            device: None,
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            snapshot_quality: default_snapshot_quality(),
        }
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            max_frame_rate: default_max_frame_rate(),
        }
    }
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            port: default_ssh_port(),
            autostart: false,
            bind_listener: false,
            keys_path: None,
        }
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("hearth").join("config.toml")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("hearth")
                .join("config.toml")
        } else {
            PathBuf::from("/etc/hearth/config.toml")
        }
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| HearthError::config(format!("Failed to read config file: {}", e)))?;

        let config: ConfigFile = toml::from_str(&content)?;
        config.validate()?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration, logging warnings but returning defaults on error
    pub fn load_or_default() -> Self {
        Self::load_from_or_default(&Self::default_path())
    }

    /// Load from `path`, logging warnings but returning defaults on error
    pub fn load_from_or_default(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(HearthError::config(format!(
                "camera resolution {}x{} is invalid",
                self.camera.width, self.camera.height
            )));
        }
        if self.camera.fps == 0 {
            return Err(HearthError::config("camera.fps must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.camera.snapshot_quality) {
            return Err(HearthError::config(format!(
                "camera.snapshot_quality {} is outside 0.0-1.0",
                self.camera.snapshot_quality
            )));
        }
        if self.streams.max_frame_rate == 0 {
            return Err(HearthError::config("streams.max_frame_rate must be at least 1"));
        }
        if self.server.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(HearthError::config("server.api_key must not be empty"));
        }
        Ok(())
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    HearthError::config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| HearthError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| HearthError::config(format!("Failed to write config file: {}", e)))?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Write the commented sample config to `path` unless it already exists
    pub fn create_sample_if_missing(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    HearthError::config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }
        std::fs::write(path, sample_config())
            .map_err(|e| HearthError::config(format!("Failed to write config file: {}", e)))?;

        info!("Created sample configuration at {:?}", path);
        Ok(true)
    }
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# Hearth Configuration

[server]
# Address and port for the HTTP API
bind = "0.0.0.0"
port = 8080

# Shared secret clients send in the X-API-Key header.
# HEARTH_API_KEY overrides this. When neither is set a random key
# is generated at startup and printed to the log.
# api_key = "change-me"

# Hide internal error details from API clients
release_mode = false

# Reported by GET /version
build_number = "1"

[camera]
# Capture backend: synthetic (test pattern), v4l2 (Linux webcams)
backend = "synthetic"

# Device id (see `hearth cameras`); the first device is used when unset
# device = "/dev/video0"

# Requested capture format
width = 1280
height = 720
fps = 30

# JPEG quality for snapshots (0.0 - 1.0)
snapshot_quality = 0.9

[streams]
# Highest frame rate a client may request for a stream
max_frame_rate = 60

[ssh]
# Default port for POST /api/v1/ssh/start
port = 2222

# Start the remote-access listener together with the server
autostart = false

# Bind a TCP socket on the port (false = bookkeeping only)
bind_listener = false

# Authorized keys file (default: ~/.local/share/hearth/authorized_keys.json)
# keys_path = "/var/lib/hearth/authorized_keys.json"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.camera.backend, BackendKind::Synthetic);
        assert_eq!(config.streams.max_frame_rate, 60);
        assert_eq!(config.ssh.port, 2222);
    }

    #[test]
    fn test_sample_config_parses() {
        let sample = sample_config();
        let config: ConfigFile = toml::from_str(&sample).unwrap();
        assert_eq!(config, ConfigFile::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ConfigFile = toml::from_str("[camera]\nfps = 15\n").unwrap();
        assert_eq!(config.camera.fps, 15);
        assert_eq!(config.camera.width, 1280);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_validate_rejects_bad_quality() {
        let mut config = ConfigFile::default();
        config.camera.snapshot_quality = 1.5;
        assert!(config.validate().is_err());
    }
}
