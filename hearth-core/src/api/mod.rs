//! HTTP control plane
//!
//! Routes:
//! - `GET /health`, `GET /version` - unauthenticated
//! - `/api/v1/cameras...` - device listing, selection and snapshots
//! - `/api/v1/streams...` - stream sessions and their latest frames
//! - `/api/v1/ssh...` - remote-access listener and authorized keys
//! - `GET /api/v1/status` - aggregate server status
//!
//! Everything under `/api/v1` requires the `X-API-Key` header. JSON
//! responses use the `{success, data, error}` envelope.

mod auth;
mod cameras;
mod envelope;
mod error;
mod ssh;
mod streams;
mod system;

pub use auth::API_KEY_HEADER;
pub use cameras::{CameraInfo, SelectCameraRequest};
pub use envelope::{Empty, Envelope};
pub use error::{ApiError, ApiResult};
pub use ssh::{AddKeyRequest, KeySummary, SshStartRequest, SshStatusResponse};
pub use streams::{StartStreamRequest, StartStreamResponse};
pub use system::{CameraStatus, HttpStatus, ServerStatus, VersionInfo};

use axum::Router;
use axum::body::Bytes;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodRouter, delete, get, post};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

use crate::capture::CaptureSource;
use crate::remote::{DEFAULT_SSH_PORT, RemoteAccessRegistry};
use crate::stream::StreamRegistry;

/// API version segment
pub const API_VERSION: &str = "v1";

/// Settings the handlers need
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Expected `X-API-Key` value
    pub api_key: String,
    /// Hide internal error details
    pub release_mode: bool,
    /// HTTP port, reported by status
    pub port: u16,
    /// Reported by `/version`
    pub build_number: String,
    /// Highest frame rate a stream may request
    pub max_frame_rate: u32,
    /// Port used when `/ssh/start` omits one
    pub default_ssh_port: u16,
}

impl ApiSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            release_mode: false,
            port: 8080,
            build_number: "1".to_string(),
            max_frame_rate: 60,
            default_ssh_port: DEFAULT_SSH_PORT,
        }
    }
}

/// Services shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub capture: Arc<CaptureSource>,
    pub streams: Arc<StreamRegistry>,
    pub remote: Arc<RemoteAccessRegistry>,
    pub settings: Arc<ApiSettings>,
}

impl AppState {
    pub fn new(
        streams: Arc<StreamRegistry>,
        remote: Arc<RemoteAccessRegistry>,
        settings: ApiSettings,
    ) -> Self {
        Self {
            capture: Arc::clone(streams.capture()),
            streams,
            remote,
            settings: Arc::new(settings),
        }
    }

    /// 500 error; the detail is only exposed outside release mode
    pub(crate) fn internal_error(&self, detail: impl std::fmt::Display) -> ApiError {
        error!("Internal error: {}", detail);
        if self.settings.release_mode {
            ApiError::internal("Internal server error")
        } else {
            ApiError::internal(detail.to_string())
        }
    }

    /// Run a blocking component call off the async runtime
    pub(crate) async fn blocking<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| self.internal_error(format!("Blocking task failed: {}", e)))
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/status", endpoint(get(system::status)))
        .route("/cameras", endpoint(get(cameras::list_cameras)))
        .route("/cameras/snapshot", endpoint(get(cameras::snapshot)))
        .route("/cameras/select", endpoint(post(cameras::select_camera)))
        .route(
            "/streams",
            endpoint(get(streams::list_streams).post(streams::start_stream)),
        )
        .route("/streams/:stream_id", endpoint(delete(streams::stop_stream)))
        .route("/streams/:stream_id/frame", endpoint(get(streams::get_frame)))
        .route("/ssh/status", endpoint(get(ssh::status)))
        .route("/ssh/start", endpoint(post(ssh::start)))
        .route("/ssh/stop", endpoint(post(ssh::stop)))
        .route("/ssh/keys", endpoint(get(ssh::list_keys).post(ssh::add_key)))
        .route("/ssh/keys/:key_id", endpoint(delete(ssh::remove_key)))
        .route("/ssh/connections", endpoint(get(ssh::list_connections)))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(system::health))
        .route("/version", get(system::version))
        .nest(&format!("/api/{}", API_VERSION), api)
        .fallback(system::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// Unsupported methods on a known path get an enveloped 405; the auth
/// route layer wraps this fallback too
fn endpoint(methods: MethodRouter<AppState>) -> MethodRouter<AppState> {
    methods.fallback(system::method_not_allowed)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(API_KEY_HEADER)])
}

/// Raw JPEG response that must not be cached
pub(crate) fn jpeg_response(jpeg: Bytes) -> Response {
    (
        [
            (CONTENT_TYPE, HeaderValue::from_static("image/jpeg")),
            (CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
        jpeg,
    )
        .into_response()
}

/// Parse an optional JSON body; an empty body yields the default
pub(crate) fn parse_optional_body<T>(body: &[u8]) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(body)?)
}

/// Parse a path segment as a UUID
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid {} id: {}", what, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, serde::Deserialize, PartialEq)]
    struct Body {
        port: Option<u16>,
    }

    #[test]
    fn test_parse_optional_body() {
        assert_eq!(parse_optional_body::<Body>(b"").unwrap(), Body::default());
        assert_eq!(parse_optional_body::<Body>(b" \n").unwrap(), Body::default());
        assert_eq!(
            parse_optional_body::<Body>(br#"{"port": 2200}"#).unwrap(),
            Body { port: Some(2200) }
        );
        assert!(parse_optional_body::<Body>(b"{port").is_err());
    }

    #[test]
    fn test_parse_id() {
        assert!(parse_id("not-a-uuid", "stream").is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "stream").unwrap(), id);
    }
}
