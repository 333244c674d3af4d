//! Service wiring and the HTTP server lifecycle

use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::{self, ApiSettings, AppState, ServerStatus};
use crate::capture::{CaptureSource, create_backend};
use crate::config::ServerConfig;
use crate::error::{HearthError, Result, ResultExt};
use crate::remote::{AccessTransport, KeyStore, MetadataTransport, RemoteAccessRegistry, TcpTransport};
use crate::stream::StreamRegistry;

/// The assembled home server: camera, streams, remote access and HTTP API
pub struct HomeServer {
    config: ServerConfig,
    state: AppState,
}

impl HomeServer {
    /// Construct every service from a resolved configuration
    ///
    /// Nothing is started; the camera opens with the first stream.
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        let backend = create_backend(config.backend)?;
        let mut capture = CaptureSource::new(backend, config.capture.clone());
        if let Some(device) = &config.device {
            capture = capture.with_preferred_device(device.clone());
        }
        let streams = Arc::new(StreamRegistry::new(Arc::new(capture)));

        let transport: Box<dyn AccessTransport> = if config.ssh_bind_listener {
            Box::new(TcpTransport::new(config.bind))
        } else {
            Box::new(MetadataTransport)
        };
        let remote = RemoteAccessRegistry::load(KeyStore::new(&config.keys_path), transport)
            .context("Loading authorized keys")?;

        let settings = ApiSettings {
            api_key: config.api_key.clone(),
            release_mode: config.release_mode,
            port: config.port,
            build_number: config.build_number.clone(),
            max_frame_rate: config.max_frame_rate,
            default_ssh_port: config.ssh_port,
        };

        Ok(Self {
            state: AppState::new(streams, Arc::new(remote), settings),
            config,
        })
    }

    /// Shared handler state
    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Application router
    pub fn router(&self) -> axum::Router {
        api::router(self.state.clone())
    }

    pub fn status(&self) -> ServerStatus {
        ServerStatus::collect(&self.state)
    }

    /// Serve until `shutdown` resolves, then release every resource
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.config.ssh_autostart {
            let remote = self.state.remote.clone();
            let port = self.config.ssh_port;
            let started = tokio::task::spawn_blocking(move || remote.start(port))
                .await
                .unwrap_or(false);
            if !started {
                warn!("Remote access autostart on port {} failed", port);
            }
        }

        let addr = self.config.socket_addr();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| HearthError::listener(format!("Failed to bind {}: {}", addr, e)))?;
        info!("Hearth API listening on http://{}", addr);

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await;

        self.shutdown().await;
        result.map_err(|e| HearthError::listener(format!("HTTP server error: {}", e)))
    }

    /// Stop every stream session and the access listener
    pub async fn shutdown(&self) {
        let streams = self.state.streams.clone();
        let remote = self.state.remote.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let stopped = streams.stop_all();
            remote.stop();
            stopped
        })
        .await;

        match joined {
            Ok(stopped) => info!("Shutdown complete, stopped {} streams", stopped),
            Err(e) => error!("Shutdown task failed: {}", e),
        }
    }
}

/// Resolves on Ctrl+C
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;
    use std::net::{IpAddr, Ipv4Addr};
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> ServerConfig {
        ServerConfig::from_file(&ConfigFile::default())
            .unwrap()
            .with_bind(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .with_port(0)
            .with_api_key("secret")
            .with_keys_path(dir.path().join("keys.json"))
    }

    #[test]
    fn test_from_config_starts_nothing() {
        let dir = TempDir::new().unwrap();
        let server = HomeServer::from_config(test_config(&dir)).unwrap();

        let status = server.status();
        assert!(!status.camera.running);
        assert_eq!(status.camera.backend, "synthetic");
        assert!(!status.ssh.running);
        assert_eq!(status.streams, 0);
        assert_eq!(server.state().settings.api_key, "secret");
    }

    #[test]
    fn test_corrupt_key_file_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("keys.json"), "{not json").unwrap();
        assert!(HomeServer::from_config(test_config(&dir)).is_err());
    }

    #[tokio::test]
    async fn test_serve_releases_resources_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.ssh_autostart = true;
        let server = HomeServer::from_config(config).unwrap();
        let state = server.state().clone();

        state.streams.start_stream(crate::encode::QualityTier::Low, 5).unwrap();
        assert!(state.capture.is_running());

        server.serve(async {}).await.unwrap();
        assert!(state.streams.is_empty());
        assert!(!state.capture.is_running());
        assert!(!state.remote.is_running());
    }
}
