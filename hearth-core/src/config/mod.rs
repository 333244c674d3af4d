//! Configuration for Hearth
//!
//! `ConfigFile` mirrors the TOML file; `ServerConfig` is the resolved
//! runtime configuration after CLI and environment overrides.

mod file;

pub use file::{
    CameraSettings, ConfigFile, ServerSettings, SshSettings, StreamSettings, sample_config,
};

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use uuid::Uuid;

use crate::capture::{BackendKind, CaptureSettings};
use crate::error::{HearthError, Result};
use crate::remote::KeyStore;

/// Resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP API binds to
    pub bind: IpAddr,
    /// HTTP port
    pub port: u16,
    /// Expected `X-API-Key` value
    pub api_key: String,
    /// Whether `api_key` was generated because none was configured
    pub api_key_generated: bool,
    /// Hide internal error details
    pub release_mode: bool,
    /// Build number for `/version`
    pub build_number: String,
    /// Camera backend
    pub backend: BackendKind,
    /// Preferred camera id
    pub device: Option<String>,
    /// Capture parameters
    pub capture: CaptureSettings,
    /// Highest frame rate a stream may request
    pub max_frame_rate: u32,
    /// Default remote-access port
    pub ssh_port: u16,
    /// Start remote access with the server
    pub ssh_autostart: bool,
    /// Use the TCP transport instead of bookkeeping only
    pub ssh_bind_listener: bool,
    /// Authorized-key file
    pub keys_path: PathBuf,
}

impl ServerConfig {
    /// Resolve a config file; generates an API key when none is set
    pub fn from_file(file: &ConfigFile) -> Result<Self> {
        file.validate()?;

        let bind: IpAddr = file.server.bind.parse().map_err(|e| {
            HearthError::config(format!("Invalid bind address '{}': {}", file.server.bind, e))
        })?;

        let (api_key, api_key_generated) = match &file.server.api_key {
            Some(key) => (key.clone(), false),
            None => (generate_api_key(), true),
        };

        Ok(Self {
            bind,
            port: file.server.port,
            api_key,
            api_key_generated,
            release_mode: file.server.release_mode,
            build_number: file.server.build_number.clone(),
            backend: file.camera.backend,
            device: file.camera.device.clone(),
            capture: CaptureSettings {
                width: file.camera.width,
                height: file.camera.height,
                fps: file.camera.fps,
                snapshot_quality: file.camera.snapshot_quality,
            },
            max_frame_rate: file.streams.max_frame_rate,
            ssh_port: file.ssh.port,
            ssh_autostart: file.ssh.autostart,
            ssh_bind_listener: file.ssh.bind_listener,
            keys_path: file.ssh.keys_path.clone().unwrap_or_else(KeyStore::default_path),
        })
    }

    /// Override the HTTP port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override the bind address
    pub fn with_bind(mut self, bind: IpAddr) -> Self {
        self.bind = bind;
        self
    }

    /// Use an explicit API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self.api_key_generated = false;
        self
    }

    /// Override the authorized-key file
    pub fn with_keys_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.keys_path = path.into();
        self
    }

    /// Override release mode
    pub fn with_release_mode(mut self, release_mode: bool) -> Self {
        self.release_mode = release_mode;
        self
    }

    /// Address the HTTP API listens on
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

/// Random 32-character hex API key
pub fn generate_api_key() -> String {
    Uuid::new_v4().simple().to_string()
}
