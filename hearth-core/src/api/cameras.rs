//! Camera endpoints

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::envelope::{Empty, Envelope};
use super::error::{ApiError, ApiResult};
use super::{AppState, jpeg_response};
use crate::types::{CameraDevice, CameraPosition};

/// Camera entry in `GET /api/v1/cameras`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    pub id: String,
    pub name: String,
    pub position: CameraPosition,
    /// Whether this is the current device
    pub selected: bool,
}

impl CameraInfo {
    fn new(device: CameraDevice, current: Option<&CameraDevice>) -> Self {
        let selected = current.is_some_and(|c| c.id == device.id);
        Self {
            id: device.id,
            name: device.name,
            position: device.position,
            selected,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectCameraRequest {
    pub camera_id: String,
}

pub(super) async fn list_cameras(State(state): State<AppState>) -> ApiResult<Vec<CameraInfo>> {
    let capture = state.capture.clone();
    let (devices, current) = state
        .blocking(move || (capture.list_devices(), capture.current_device()))
        .await?;

    let cameras = devices
        .into_iter()
        .map(|device| CameraInfo::new(device, current.as_ref()))
        .collect();
    Ok(Envelope::ok(cameras))
}

pub(super) async fn snapshot(State(state): State<AppState>) -> Result<Response, ApiError> {
    let capture = state.capture.clone();
    match state.blocking(move || capture.snapshot()).await? {
        Some(jpeg) => Ok(jpeg_response(jpeg)),
        None => Err(ApiError::internal("No camera frame available")),
    }
}

pub(super) async fn select_camera(
    State(state): State<AppState>,
    payload: Result<Json<SelectCameraRequest>, JsonRejection>,
) -> ApiResult<Empty> {
    let Json(request) = payload?;
    debug!("Selecting camera {}", request.camera_id);

    let capture = state.capture.clone();
    let camera_id = request.camera_id.clone();
    if state.blocking(move || capture.select_device(&camera_id)).await? {
        Ok(Envelope::ok(Empty {}))
    } else {
        Err(ApiError::bad_request(format!(
            "Failed to select camera {}",
            request.camera_id
        )))
    }
}
