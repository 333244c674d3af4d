//! Synthetic test-pattern camera
//!
//! Always available, needs no hardware. Produces a moving color pattern at
//! the requested resolution and frame rate. Used as the default backend and
//! by the test suite.

use std::time::{Duration, Instant};
use tracing::info;

use super::backend::{CameraBackend, CaptureSettings, DeviceStream};
use crate::error::{HearthError, Result};
use crate::types::{CameraDevice, CameraPosition, Frame, FrameFormat};

/// Longest single wait inside `next_frame`, keeps shutdown responsive
const MAX_WAIT: Duration = Duration::from_millis(50);

/// Backend exposing one or more synthetic devices
#[derive(Debug, Clone)]
pub struct SyntheticBackend {
    devices: Vec<CameraDevice>,
}

impl SyntheticBackend {
    /// Backend with a front and a back test-pattern device
    pub fn new() -> Self {
        Self {
            devices: vec![
                CameraDevice::new("synthetic:0", "Test Pattern (front)", CameraPosition::Front),
                CameraDevice::new("synthetic:1", "Test Pattern (back)", CameraPosition::Back),
            ],
        }
    }

    /// Backend with an explicit device list (may be empty)
    pub fn with_devices(devices: Vec<CameraDevice>) -> Self {
        Self { devices }
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for SyntheticBackend {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn list_devices(&self) -> Result<Vec<CameraDevice>> {
        Ok(self.devices.clone())
    }

    fn open(
        &self,
        device: &CameraDevice,
        settings: &CaptureSettings,
    ) -> Result<Box<dyn DeviceStream>> {
        if !self.devices.iter().any(|d| d.id == device.id) {
            return Err(HearthError::DeviceNotFound(device.id.clone()));
        }
        if settings.width == 0 || settings.height == 0 || settings.fps == 0 {
            return Err(HearthError::camera(format!(
                "Unsupported capture format {}x{} @ {}fps",
                settings.width, settings.height, settings.fps
            )));
        }

        info!(
            "Opened {} at {}x{} @ {}fps (synthetic)",
            device.id, settings.width, settings.height, settings.fps
        );

        // Offset the pattern per device so switching is visible
        let phase = self.devices.iter().position(|d| d.id == device.id).unwrap_or(0) as u64 * 85;

        Ok(Box::new(SyntheticStream {
            format: FrameFormat {
                width: settings.width,
                height: settings.height,
            },
            interval: Duration::from_secs_f64(1.0 / settings.fps as f64),
            next_due: Instant::now(),
            sequence: 0,
            phase,
        }))
    }
}

/// Paced generator of test-pattern frames
struct SyntheticStream {
    format: FrameFormat,
    interval: Duration,
    next_due: Instant,
    sequence: u64,
    phase: u64,
}

impl SyntheticStream {
    fn render(&self) -> Vec<u8> {
        let width = self.format.width as usize;
        let height = self.format.height as usize;
        let shift = (self.sequence * 4 + self.phase) as usize;

        let mut data = Vec::with_capacity(self.format.rgb_len());
        for y in 0..height {
            for x in 0..width {
                let r = ((x + shift) * 255 / width.max(1)) as u8;
                let g = (y * 255 / height.max(1)) as u8;
                let b = ((x + y + shift) % 256) as u8;
                data.extend_from_slice(&[r, g, b]);
            }
        }
        data
    }
}

impl DeviceStream for SyntheticStream {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let now = Instant::now();
        if now < self.next_due {
            let wait = self.next_due - now;
            if wait > MAX_WAIT {
                std::thread::sleep(MAX_WAIT);
                return Ok(None);
            }
            std::thread::sleep(wait);
        }

        self.next_due += self.interval;
        // Don't try to catch up after a long stall
        let now = Instant::now();
        if self.next_due < now {
            self.next_due = now + self.interval;
        }

        self.sequence += 1;
        let data = self.render();
        Ok(Some(Frame::new(
            self.format.width,
            self.format.height,
            data,
            self.sequence,
        )))
    }

    fn format(&self) -> FrameFormat {
        self.format
    }
}
