//! Camera capture
//!
//! This module handles:
//! - Device enumeration and selection through a `CameraBackend`
//! - A dedicated capture thread delivering frames to subscribers
//! - On-demand JPEG snapshots of the latest frame

pub mod backend;
mod source;
mod stream;
pub mod synthetic;
#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use backend::{CameraBackend, CaptureSettings, DeviceStream, FrameSink};
pub use source::CaptureSource;
pub use synthetic::SyntheticBackend;
#[cfg(feature = "v4l2")]
pub use v4l2::V4l2Backend;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{HearthError, Result};

/// Available camera backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Generated test pattern
    #[default]
    Synthetic,
    /// Linux V4L2 webcams
    V4l2,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Synthetic => write!(f, "synthetic"),
            Self::V4l2 => write!(f, "v4l2"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "synthetic" | "test" => Ok(Self::Synthetic),
            "v4l2" | "v4l" => Ok(Self::V4l2),
            _ => Err(format!("Unknown camera backend: {}", s)),
        }
    }
}

/// Construct the backend for `kind`
///
/// Fails for `v4l2` when the crate was built without the `v4l2` feature.
pub fn create_backend(kind: BackendKind) -> Result<Arc<dyn CameraBackend>> {
    match kind {
        BackendKind::Synthetic => Ok(Arc::new(SyntheticBackend::new())),
        #[cfg(feature = "v4l2")]
        BackendKind::V4l2 => Ok(Arc::new(V4l2Backend::new())),
        #[cfg(not(feature = "v4l2"))]
        BackendKind::V4l2 => Err(HearthError::config(
            "the v4l2 camera backend requires building with the `v4l2` feature",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("synthetic".parse::<BackendKind>().ok(), Some(BackendKind::Synthetic));
        assert_eq!("V4L2".parse::<BackendKind>().ok(), Some(BackendKind::V4l2));
        assert!("pipewire".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_create_synthetic_backend() {
        let backend = create_backend(BackendKind::Synthetic).unwrap();
        assert_eq!(backend.name(), "synthetic");
    }
}
