//! Camera backend seams
//!
//! A `CameraBackend` enumerates and opens devices; an opened device is a
//! `DeviceStream` that the capture thread pulls frames from. Frames are then
//! fanned out to every registered `FrameSink`.

use std::sync::Arc;

use crate::error::Result;
use crate::types::{CameraDevice, Frame, FrameFormat};

/// Requested capture parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    /// Requested frame width
    pub width: u32,
    /// Requested frame height
    pub height: u32,
    /// Requested frames per second
    pub fps: u32,
    /// Compression factor used for on-demand snapshots
    pub snapshot_quality: f64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            snapshot_quality: 0.9,
        }
    }
}

impl CaptureSettings {
    /// Settings with the given resolution and frame rate
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            fps,
            ..Default::default()
        }
    }
}

/// Source of camera devices
pub trait CameraBackend: Send + Sync {
    /// Short backend name for logs and status output
    fn name(&self) -> &str;

    /// Enumerate currently attached devices
    fn list_devices(&self) -> Result<Vec<CameraDevice>>;

    /// Device to use when none has been selected
    fn default_device(&self) -> Result<Option<CameraDevice>> {
        Ok(self.list_devices()?.into_iter().next())
    }

    /// Open a device for capture
    fn open(&self, device: &CameraDevice, settings: &CaptureSettings)
    -> Result<Box<dyn DeviceStream>>;
}

/// An opened device producing raw frames
pub trait DeviceStream: Send {
    /// Wait a bounded time for the next frame
    ///
    /// Returns `Ok(None)` when no frame arrived in time so the capture thread
    /// can check for shutdown. Implementations must not block indefinitely.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Negotiated output format
    fn format(&self) -> FrameFormat;
}

/// Receiver of captured frames
///
/// Invoked synchronously on the capture thread for every frame. Handlers must
/// not call back into `subscribe`/`unsubscribe`.
pub trait FrameSink: Send + Sync {
    /// Handle a newly captured frame
    fn on_frame(&self, frame: &Arc<Frame>);
}

impl<F> FrameSink for F
where
    F: Fn(&Arc<Frame>) + Send + Sync,
{
    fn on_frame(&self, frame: &Arc<Frame>) {
        self(frame)
    }
}
