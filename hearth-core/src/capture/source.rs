//! The shared camera capture source

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, error, info, warn};

use super::backend::{CameraBackend, CaptureSettings, DeviceStream, FrameSink};
use super::stream::{CaptureWorker, SharedState};
use crate::encode::encode_jpeg;
use crate::error::{HearthError, Result, ResultExt};
use crate::types::{CameraDevice, Frame, SubscriptionId};

/// Single owner of the physical camera
///
/// Frames are captured on a dedicated thread and handed synchronously to
/// every subscriber. The most recent frame is retained for snapshots even
/// after capture stops.
pub struct CaptureSource {
    /// Device enumeration and opening
    backend: Arc<dyn CameraBackend>,
    /// Requested capture parameters
    settings: CaptureSettings,
    /// Device selection and the running worker
    state: Mutex<SourceState>,
    /// State shared with the capture thread
    shared: Arc<SharedState>,
}

#[derive(Default)]
struct SourceState {
    /// Explicitly selected device
    selected: Option<CameraDevice>,
    /// Device id requested by configuration, resolved on first start
    preferred_id: Option<String>,
    /// Device the worker is capturing from
    active: Option<CameraDevice>,
    /// Capture thread (when started)
    worker: Option<CaptureWorker>,
}

impl CaptureSource {
    /// Create a capture source; nothing is opened until `start`
    pub fn new(backend: Arc<dyn CameraBackend>, settings: CaptureSettings) -> Self {
        Self {
            backend,
            settings,
            state: Mutex::new(SourceState::default()),
            shared: Arc::new(SharedState::new()),
        }
    }

    /// Prefer a device id when nothing has been selected yet
    pub fn with_preferred_device(self, id: impl Into<String>) -> Self {
        self.state.lock().preferred_id = Some(id.into());
        self
    }

    /// Start capturing
    ///
    /// Idempotent. Returns false when no device is available or it cannot
    /// be opened; the cause is logged.
    pub fn start(&self) -> bool {
        let mut state = self.state.lock();
        match self.start_locked(&mut state) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to start camera capture: {}", e);
                false
            }
        }
    }

    /// Stop capturing. Idempotent.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        self.stop_locked(&mut state);
    }

    /// Whether frames are being delivered
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Register a frame handler
    pub fn subscribe(&self, sink: Arc<dyn FrameSink>) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.shared.subscribers.write().insert(id, sink);
        debug!("Added frame subscriber {}", id);
        id
    }

    /// Remove a frame handler; unknown ids are ignored
    ///
    /// A frame already being delivered may still reach the handler once.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.shared.subscribers.write().remove(&id).is_some();
        if removed {
            debug!("Removed frame subscriber {}", id);
        } else {
            debug!("Unsubscribe for unknown {}", id);
        }
        removed
    }

    /// Number of registered handlers
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.read().len()
    }

    /// Encode the most recent frame as a full-resolution JPEG
    ///
    /// Returns `None` if no frame has ever been captured or encoding fails.
    pub fn snapshot(&self) -> Option<Bytes> {
        let frame = self.latest_frame()?;
        match encode_jpeg(&frame, 1.0, self.settings.snapshot_quality) {
            Ok(jpeg) => Some(Bytes::from(jpeg)),
            Err(e) => {
                warn!("Snapshot of frame {} failed: {}", frame.sequence, e);
                None
            }
        }
    }

    /// Most recent raw frame, if any
    pub fn latest_frame(&self) -> Option<Arc<Frame>> {
        self.shared.latest.lock().clone()
    }

    /// Enumerate attached devices
    ///
    /// Backend failures are logged and yield an empty list.
    pub fn list_devices(&self) -> Vec<CameraDevice> {
        match self.backend.list_devices() {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Failed to enumerate cameras: {}", e);
                Vec::new()
            }
        }
    }

    /// Switch to another device by id
    ///
    /// When running, the new device is opened before the current one is
    /// released, so a failed switch leaves capture running on the previous
    /// device. Returns false if the id is not currently attached or the new
    /// device cannot be started.
    pub fn select_device(&self, id: &str) -> bool {
        let Some(device) = self.list_devices().into_iter().find(|d| d.id == id) else {
            warn!("Cannot select camera {}: not attached", id);
            return false;
        };

        let mut state = self.state.lock();
        if state.active.as_ref().is_some_and(|d| d.id == device.id) && self.is_running() {
            debug!("Camera {} already active", id);
            return true;
        }

        if !(state.worker.is_some() && self.is_running()) {
            info!("Selected camera {}", device);
            state.selected = Some(device);
            return true;
        }

        let stream = match self
            .backend
            .open(&device, &self.settings)
            .context(format!("Opening camera {}", device.id))
        {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to switch to camera {}: {}", id, e);
                return false;
            }
        };

        self.stop_locked(&mut state);
        match self.spawn_locked(&mut state, device.clone(), stream) {
            Ok(()) => {
                info!("Selected camera {}", device);
                state.selected = Some(device);
                true
            }
            Err(e) => {
                error!("Failed to restart capture on camera {}: {}", id, e);
                if let Err(e) = self.start_locked(&mut state) {
                    error!("Failed to resume capture on previous camera: {}", e);
                }
                false
            }
        }
    }

    /// Device being captured, or the one that will be used on start
    pub fn current_device(&self) -> Option<CameraDevice> {
        let state = self.state.lock();
        state.active.clone().or_else(|| state.selected.clone())
    }

    /// Total frames captured
    pub fn frame_count(&self) -> u64 {
        self.shared.frame_count.load(Ordering::Relaxed)
    }

    /// Name of the camera backend
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    fn start_locked(&self, state: &mut SourceState) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }

        // Reap a worker that ended on its own
        if let Some(mut worker) = state.worker.take() {
            worker.stop();
            state.active = None;
        }

        let device = self.resolve_device(state)?;
        let stream = self
            .backend
            .open(&device, &self.settings)
            .context(format!("Opening camera {}", device.id))?;
        self.spawn_locked(state, device, stream)
    }

    fn spawn_locked(
        &self,
        state: &mut SourceState,
        device: CameraDevice,
        stream: Box<dyn DeviceStream>,
    ) -> Result<()> {
        self.shared.running.store(true, Ordering::SeqCst);
        let worker = match CaptureWorker::spawn(stream, Arc::clone(&self.shared)) {
            Ok(worker) => worker,
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        info!(
            "Camera capture started on {} at {}x{} @ {}fps",
            device, self.settings.width, self.settings.height, self.settings.fps
        );
        state.worker = Some(worker);
        state.active = Some(device);
        Ok(())
    }

    fn stop_locked(&self, state: &mut SourceState) {
        let Some(mut worker) = state.worker.take() else {
            return;
        };

        worker.stop();
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(device) = state.active.take() {
            info!("Camera capture stopped on {}", device.id);
        }
    }

    fn resolve_device(&self, state: &mut SourceState) -> Result<CameraDevice> {
        if let Some(device) = &state.selected {
            return Ok(device.clone());
        }

        if let Some(id) = state.preferred_id.take() {
            match self.backend.list_devices()?.into_iter().find(|d| d.id == id) {
                Some(device) => {
                    state.selected = Some(device.clone());
                    return Ok(device);
                }
                None => warn!("Configured camera {} not found, using default", id),
            }
        }

        self.backend
            .default_device()?
            .ok_or_else(|| HearthError::DeviceNotFound("no camera attached".to_string()))
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::SyntheticBackend;

    fn source() -> CaptureSource {
        CaptureSource::new(
            Arc::new(SyntheticBackend::new()),
            CaptureSettings::new(16, 12, 60),
        )
    }

    #[test]
    fn test_start_stop_idempotent() {
        let source = source();
        assert!(!source.is_running());
        assert!(source.start());
        assert!(source.start());
        assert!(source.is_running());
        source.stop();
        source.stop();
        assert!(!source.is_running());
    }

    #[test]
    fn test_preferred_device_resolved_on_start() {
        let source = source().with_preferred_device("synthetic:1");
        assert!(source.start());
        assert_eq!(source.current_device().map(|d| d.id), Some("synthetic:1".to_string()));
    }

    #[test]
    fn test_unknown_preferred_device_falls_back() {
        let source = source().with_preferred_device("missing");
        assert!(source.start());
        assert_eq!(source.current_device().map(|d| d.id), Some("synthetic:0".to_string()));
    }

    #[test]
    fn test_unsubscribe_unknown_is_noop() {
        let source = source();
        assert!(!source.unsubscribe(SubscriptionId::next()));
    }
}
