//! API-key authentication

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::AppState;
use super::error::ApiError;

/// Header carrying the shared secret
pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests whose `X-API-Key` does not match the configured key
pub async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(key) if constant_time_eq(key.as_bytes(), state.settings.api_key.as_bytes()) => {
            next.run(request).await
        }
        Some(_) => {
            warn!("Rejected {} {}: invalid API key", request.method(), request.uri().path());
            ApiError::unauthorized("Invalid API key").into_response()
        }
        None => {
            warn!("Rejected {} {}: missing API key", request.method(), request.uri().path());
            ApiError::unauthorized("Missing API key").into_response()
        }
    }
}

/// Compare without short-circuiting on the first differing byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
