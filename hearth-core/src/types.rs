//! Core types for Hearth
//!
//! These types represent the data shared between the capture source, the
//! stream sessions and the HTTP control plane.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Global counter for subscription tokens
static SUBSCRIPTION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque token returned by `CaptureSource::subscribe`
///
/// Tokens are process-unique and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Allocate a new unique token
    pub fn next() -> Self {
        Self(SUBSCRIPTION_COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Subscription({})", self.0)
    }
}

/// Physical mounting of a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraPosition {
    /// Front-facing camera
    Front,
    /// Rear-facing camera
    Back,
    /// Position not reported by the device
    #[default]
    Unspecified,
    /// Externally attached (e.g. USB) camera
    External,
}

impl std::fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraPosition::Front => write!(f, "front"),
            CameraPosition::Back => write!(f, "back"),
            CameraPosition::Unspecified => write!(f, "unspecified"),
            CameraPosition::External => write!(f, "external"),
        }
    }
}

/// A camera device as enumerated by a backend
///
/// Devices are enumerated fresh on every listing call and are not cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDevice {
    /// Backend-specific opaque identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Physical position
    pub position: CameraPosition,
}

impl CameraDevice {
    /// Create a new device description
    pub fn new(id: impl Into<String>, name: impl Into<String>, position: CameraPosition) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position,
        }
    }
}

impl std::fmt::Display for CameraDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {} ({})", self.id, self.name, self.position)
    }
}

/// Frame format information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl FrameFormat {
    /// Expected length of a packed RGB24 buffer in this format
    pub fn rgb_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// A raw captured video frame
///
/// Pixel data is packed RGB24, row-major, no padding.
#[derive(Debug)]
pub struct Frame {
    /// Frame format
    pub format: FrameFormat,
    /// Packed RGB24 pixels
    pub data: Vec<u8>,
    /// Capture sequence number, starting at 1 for each capture run
    pub sequence: u64,
    /// Capture timestamp in nanoseconds since the Unix epoch
    pub pts: u64,
}

impl Frame {
    /// Create a frame stamped with the current wall-clock time
    pub fn new(width: u32, height: u32, data: Vec<u8>, sequence: u64) -> Self {
        Self {
            format: FrameFormat { width, height },
            data,
            sequence,
            pts: now_nanos(),
        }
    }

    /// Whether the pixel buffer matches the declared dimensions
    pub fn is_well_formed(&self) -> bool {
        self.format.width > 0 && self.format.height > 0 && self.data.len() == self.format.rgb_len()
    }
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_ids_are_unique() {
        let a = SubscriptionId::next();
        let b = SubscriptionId::next();
        assert_ne!(a, b);
        assert!(b.0 > a.0);
    }

    #[test]
    fn camera_position_serializes_lowercase() {
        let json = serde_json::to_string(&CameraPosition::External).unwrap();
        assert_eq!(json, "\"external\"");
    }

    #[test]
    fn frame_well_formed() {
        let frame = Frame::new(4, 2, vec![0; 24], 1);
        assert!(frame.is_well_formed());

        let short = Frame::new(4, 2, vec![0; 10], 1);
        assert!(!short.is_well_formed());
    }
}
