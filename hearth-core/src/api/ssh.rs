//! Remote-access endpoints

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::envelope::{Empty, Envelope};
use super::error::{ApiError, ApiResult};
use super::{AppState, parse_id, parse_optional_body};
use crate::remote::{AuthorizedKey, RemoteConnection, decode_key_data};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshStatusResponse {
    pub running: bool,
    pub port: u16,
    pub connections: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SshStartRequest {
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddKeyRequest {
    /// Base64-encoded key material
    pub key: String,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Key listing entry; the key material itself is never returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySummary {
    pub id: Uuid,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuthorizedKey> for KeySummary {
    fn from(key: AuthorizedKey) -> Self {
        Self {
            id: key.id,
            comment: key.comment,
            created_at: key.created_at,
        }
    }
}

fn current_status(state: &AppState) -> SshStatusResponse {
    let status = state.remote.status();
    SshStatusResponse {
        running: status.running,
        port: status.port.unwrap_or(state.settings.default_ssh_port),
        connections: status.connections,
    }
}

pub(super) async fn status(State(state): State<AppState>) -> ApiResult<SshStatusResponse> {
    Ok(Envelope::ok(current_status(&state)))
}

pub(super) async fn start(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<SshStatusResponse> {
    let request: SshStartRequest = parse_optional_body(&body)?;
    let port = request.port.unwrap_or(state.settings.default_ssh_port);

    let remote = state.remote.clone();
    if state.blocking(move || remote.start(port)).await? {
        Ok(Envelope::ok(current_status(&state)))
    } else {
        Err(ApiError::internal(format!(
            "Failed to start SSH listener on port {}",
            port
        )))
    }
}

pub(super) async fn stop(State(state): State<AppState>) -> ApiResult<SshStatusResponse> {
    let remote = state.remote.clone();
    state.blocking(move || remote.stop()).await?;
    Ok(Envelope::ok(current_status(&state)))
}

pub(super) async fn list_keys(State(state): State<AppState>) -> ApiResult<Vec<KeySummary>> {
    let keys = state
        .remote
        .list_authorized_keys()
        .into_iter()
        .map(KeySummary::from)
        .collect();
    Ok(Envelope::ok(keys))
}

pub(super) async fn add_key(
    State(state): State<AppState>,
    payload: Result<Json<AddKeyRequest>, JsonRejection>,
) -> ApiResult<KeySummary> {
    let Json(request) = payload?;
    let key_data = decode_key_data(&request.key)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let remote = state.remote.clone();
    let comment = request.comment.filter(|c| !c.trim().is_empty());
    match state
        .blocking(move || remote.try_add_authorized_key(key_data, comment))
        .await?
    {
        Ok(key) => Ok(Envelope::ok(KeySummary::from(key))),
        Err(e) => Err(state.internal_error(format!("Failed to save authorized key: {}", e))),
    }
}

pub(super) async fn remove_key(
    State(state): State<AppState>,
    Path(key_id): Path<String>,
) -> ApiResult<Empty> {
    let id = parse_id(&key_id, "key")?;
    let remote = state.remote.clone();
    match state
        .blocking(move || remote.try_remove_authorized_key(id))
        .await?
    {
        Ok(true) => Ok(Envelope::ok(Empty {})),
        Ok(false) => Err(ApiError::not_found(format!("Key {} not found", id))),
        Err(e) => Err(state.internal_error(format!("Failed to remove authorized key {}: {}", id, e))),
    }
}

pub(super) async fn list_connections(
    State(state): State<AppState>,
) -> ApiResult<Vec<RemoteConnection>> {
    Ok(Envelope::ok(state.remote.list_active_connections()))
}
