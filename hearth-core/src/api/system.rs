//! Health, version and status endpoints

use axum::extract::{OriginalUri, State};
use axum::http::{Method, StatusCode, Uri};
use serde::{Deserialize, Serialize};

use super::envelope::Envelope;
use super::error::{ApiError, ApiResult};
use super::{API_VERSION, AppState};
use crate::remote::RemoteStatus;
use crate::types::CameraDevice;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: String,
    pub build_number: String,
    pub api_version: String,
}

/// Derived status of every component
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub server: HttpStatus,
    pub camera: CameraStatus,
    pub ssh: RemoteStatus,
    pub streams: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpStatus {
    pub running: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraStatus {
    pub running: bool,
    pub backend: String,
    pub device: Option<CameraDevice>,
    pub frames_captured: u64,
}

impl ServerStatus {
    /// Snapshot the live state behind `state`
    pub fn collect(state: &AppState) -> Self {
        Self {
            server: HttpStatus {
                running: true,
                port: state.settings.port,
            },
            camera: CameraStatus {
                running: state.capture.is_running(),
                backend: state.capture.backend_name().to_string(),
                device: state.capture.current_device(),
                frames_captured: state.capture.frame_count(),
            },
            ssh: state.remote.status(),
            streams: state.streams.session_count(),
        }
    }
}

pub(super) async fn health() -> &'static str {
    "OK"
}

pub(super) async fn version(State(state): State<AppState>) -> ApiResult<VersionInfo> {
    Ok(Envelope::ok(VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        build_number: state.settings.build_number.clone(),
        api_version: API_VERSION.to_string(),
    }))
}

pub(super) async fn status(State(state): State<AppState>) -> ApiResult<ServerStatus> {
    Ok(Envelope::ok(ServerStatus::collect(&state)))
}

pub(super) async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}

pub(super) async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("Method {} not allowed for {}", method, uri.path()),
    )
}
