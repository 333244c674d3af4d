//! Uniform response envelope

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// `{success, data, error}` wrapper used by every JSON response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Serializes as `{}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_shape() {
        let json = serde_json::to_value(Envelope::ok(Empty {})).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": {}, "error": null}));
    }

    #[test]
    fn test_err_shape() {
        let json = serde_json::to_value(Envelope::<Empty>::err("nope")).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "data": null, "error": "nope"}));
    }
}
