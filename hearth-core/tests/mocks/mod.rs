//! Mock infrastructure for testing
//!
//! Provides a scripted camera backend whose frames are pushed by the test,
//! plus frame builders and a polling helper.

#![allow(dead_code)]

use hearth_core::capture::{CameraBackend, CaptureSettings, DeviceStream};
use hearth_core::error::{HearthError, Result};
use hearth_core::types::{CameraDevice, CameraPosition, Frame, FrameFormat};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// How long a scripted stream waits for a pushed frame
const RECV_TIMEOUT: Duration = Duration::from_millis(20);

/// Create a test frame with a solid RGB color
pub fn create_test_frame(width: u32, height: u32, color: [u8; 3], sequence: u64) -> Frame {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for _ in 0..(width * height) {
        data.extend_from_slice(&color);
    }
    Frame::new(width, height, data, sequence)
}

/// Create a test frame with a gradient pattern
pub fn create_gradient_frame(width: u32, height: u32, sequence: u64) -> Frame {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let r = ((x as f32 / width as f32) * 255.0) as u8;
            let g = ((y as f32 / height as f32) * 255.0) as u8;
            let b = (((x + y) as f32 / (width + height) as f32) * 255.0) as u8;
            data.extend_from_slice(&[r, g, b]);
        }
    }
    Frame::new(width, height, data, sequence)
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// Handle for pushing frames into the most recently opened scripted stream
#[derive(Clone, Default)]
pub struct FrameFeed {
    sender: Arc<Mutex<Option<mpsc::Sender<Frame>>>>,
}

impl FrameFeed {
    /// Deliver a frame; false if no stream is open
    pub fn push(&self, frame: Frame) -> bool {
        match self.sender.lock().as_ref() {
            Some(tx) => tx.send(frame).is_ok(),
            None => false,
        }
    }
}

/// Camera backend driven by the test
pub struct ScriptedBackend {
    devices: Vec<CameraDevice>,
    feed: FrameFeed,
    opened: Arc<Mutex<Vec<String>>>,
    open_count: AtomicUsize,
    fail_open: AtomicBool,
    fail_frames: AtomicBool,
}

impl ScriptedBackend {
    /// Backend with two devices, "cam0" and "cam1"
    pub fn new() -> Self {
        Self::with_devices(vec![
            CameraDevice::new("cam0", "Scripted Front", CameraPosition::Front),
            CameraDevice::new("cam1", "Scripted Back", CameraPosition::Back),
        ])
    }

    pub fn with_devices(devices: Vec<CameraDevice>) -> Self {
        Self {
            devices,
            feed: FrameFeed::default(),
            opened: Arc::new(Mutex::new(Vec::new())),
            open_count: AtomicUsize::new(0),
            fail_open: AtomicBool::new(false),
            fail_frames: AtomicBool::new(false),
        }
    }

    pub fn feed(&self) -> FrameFeed {
        self.feed.clone()
    }

    /// Make every `open` fail
    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Make streams opened from now on return errors
    pub fn set_fail_frames(&self, fail: bool) {
        self.fail_frames.store(fail, Ordering::SeqCst);
    }

    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::SeqCst)
    }

    /// Device ids in the order they were opened
    pub fn opened_devices(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn list_devices(&self) -> Result<Vec<CameraDevice>> {
        Ok(self.devices.clone())
    }

    fn open(
        &self,
        device: &CameraDevice,
        settings: &CaptureSettings,
    ) -> Result<Box<dyn DeviceStream>> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(HearthError::camera(format!("{} is busy", device.id)));
        }

        self.open_count.fetch_add(1, Ordering::SeqCst);
        self.opened.lock().push(device.id.clone());

        let (tx, rx) = mpsc::channel();
        *self.feed.sender.lock() = Some(tx);

        Ok(Box::new(ScriptedStream {
            rx,
            format: FrameFormat {
                width: settings.width,
                height: settings.height,
            },
            fail: self.fail_frames.load(Ordering::SeqCst),
        }))
    }
}

struct ScriptedStream {
    rx: mpsc::Receiver<Frame>,
    format: FrameFormat,
    fail: bool,
}

impl DeviceStream for ScriptedStream {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.fail {
            std::thread::sleep(Duration::from_millis(1));
            return Err(HearthError::camera("scripted read failure"));
        }

        match self.rx.recv_timeout(RECV_TIMEOUT) {
            Ok(frame) => Ok(Some(frame)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                std::thread::sleep(RECV_TIMEOUT);
                Ok(None)
            }
        }
    }

    fn format(&self) -> FrameFormat {
        self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_frame_dimensions() {
        let frame = create_test_frame(64, 48, [255, 0, 0], 1);
        assert_eq!(frame.format.width, 64);
        assert_eq!(frame.format.height, 48);
        assert!(frame.is_well_formed());
    }

    #[test]
    fn test_gradient_frame_well_formed() {
        assert!(create_gradient_frame(40, 30, 1).is_well_formed());
    }

    #[test]
    fn test_feed_without_stream() {
        let backend = ScriptedBackend::new();
        assert!(!backend.feed().push(create_test_frame(2, 2, [0, 0, 0], 1)));
    }
}
