//! Stream session endpoints

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::envelope::{Empty, Envelope};
use super::error::{ApiError, ApiResult};
use super::{API_VERSION, AppState, jpeg_response, parse_id, parse_optional_body};
use crate::encode::QualityTier;
use crate::stream::StreamInfo;

/// Frame rate used when the request omits one
const DEFAULT_FRAME_RATE: u32 = 15;

/// Body of `POST /api/v1/streams`; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartStreamRequest {
    pub quality: Option<String>,
    pub frame_rate: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartStreamResponse {
    pub stream_id: Uuid,
    pub stream_url: String,
}

pub(super) async fn list_streams(State(state): State<AppState>) -> ApiResult<Vec<StreamInfo>> {
    Ok(Envelope::ok(state.streams.list_sessions()))
}

pub(super) async fn start_stream(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<StartStreamResponse> {
    let request: StartStreamRequest = parse_optional_body(&body)?;

    let quality = match request.quality.as_deref() {
        Some(raw) => raw.parse::<QualityTier>().map_err(ApiError::bad_request)?,
        None => QualityTier::default(),
    };
    let frame_rate = request.frame_rate.unwrap_or(DEFAULT_FRAME_RATE);
    let max = state.settings.max_frame_rate;
    if frame_rate == 0 || frame_rate > max {
        return Err(ApiError::bad_request(format!(
            "frameRate must be between 1 and {}",
            max
        )));
    }

    let streams = state.streams.clone();
    match state
        .blocking(move || streams.start_stream(quality, frame_rate))
        .await?
    {
        Some(stream_id) => Ok(Envelope::ok(StartStreamResponse {
            stream_id,
            stream_url: format!("/api/{}/streams/{}/frame", API_VERSION, stream_id),
        })),
        None => Err(ApiError::internal("Failed to start camera stream")),
    }
}

pub(super) async fn stop_stream(
    State(state): State<AppState>,
    Path(stream_id): Path<String>,
) -> ApiResult<Empty> {
    let id = parse_id(&stream_id, "stream")?;
    let streams = state.streams.clone();
    state.blocking(move || streams.stop_stream(id)).await?;
    Ok(Envelope::ok(Empty {}))
}

pub(super) async fn get_frame(
    State(state): State<AppState>,
    Path(stream_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&stream_id, "stream")?;
    state
        .streams
        .get_frame(id)
        .map(jpeg_response)
        .ok_or_else(|| ApiError::not_found(format!("No frame available for stream {}", id)))
}
