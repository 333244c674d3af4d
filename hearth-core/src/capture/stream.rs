//! Capture thread
//!
//! Pulls frames from an opened `DeviceStream` on a dedicated thread, keeps
//! the newest one, and hands each frame to every subscriber.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use super::backend::{DeviceStream, FrameSink};
use crate::error::{HearthError, Result};
use crate::types::{Frame, SubscriptionId};

/// Consecutive device errors tolerated before the capture thread gives up
const MAX_CONSECUTIVE_ERRORS: u32 = 10;

/// State shared between the capture thread and the `CaptureSource`
pub(crate) struct SharedState {
    /// Whether a capture thread is delivering frames
    pub(crate) running: AtomicBool,
    /// Most recent frame (newest wins)
    pub(crate) latest: Mutex<Option<Arc<Frame>>>,
    /// Registered frame sinks
    pub(crate) subscribers: RwLock<HashMap<SubscriptionId, Arc<dyn FrameSink>>>,
    /// Frames captured since the source was created
    pub(crate) frame_count: AtomicU64,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            latest: Mutex::new(None),
            subscribers: RwLock::new(HashMap::new()),
            frame_count: AtomicU64::new(0),
        }
    }

    /// Store a frame as the latest and notify every subscriber
    pub(crate) fn publish(&self, frame: Frame) {
        let frame = Arc::new(frame);
        *self.latest.lock() = Some(Arc::clone(&frame));

        // Snapshot the sinks so handlers run without the lock held
        let sinks: Vec<Arc<dyn FrameSink>> = self.subscribers.read().values().cloned().collect();
        for sink in sinks {
            sink.on_frame(&frame);
        }

        let count = self.frame_count.fetch_add(1, Ordering::Relaxed);
        if count % 300 == 0 {
            trace!("Captured {} frames", count + 1);
        }
    }
}

/// Handle to a running capture thread
pub(crate) struct CaptureWorker {
    /// Thread pulling frames from the device
    thread: Option<std::thread::JoinHandle<()>>,
    /// Channel to signal shutdown
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl CaptureWorker {
    /// Spawn the capture thread for an opened device stream
    pub(crate) fn spawn(stream: Box<dyn DeviceStream>, shared: Arc<SharedState>) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel();

        let thread = std::thread::Builder::new()
            .name("hearth-capture".to_string())
            .spawn(move || run_capture_loop(stream, shutdown_rx, shared))
            .map_err(|e| HearthError::camera(format!("Failed to spawn capture thread: {}", e)))?;

        Ok(Self {
            thread: Some(thread),
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Signal the thread to stop and wait for it to exit
    pub(crate) fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Capture thread panicked");
            }
        }
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run the capture loop (called from the dedicated thread)
fn run_capture_loop(
    mut stream: Box<dyn DeviceStream>,
    shutdown_rx: mpsc::Receiver<()>,
    shared: Arc<SharedState>,
) {
    let format = stream.format();
    info!(
        "Capture thread started at {}x{}",
        format.width, format.height
    );

    let mut consecutive_errors = 0u32;
    loop {
        match shutdown_rx.try_recv() {
            Ok(()) | Err(mpsc::TryRecvError::Disconnected) => {
                debug!("Capture shutdown signal received");
                break;
            }
            Err(mpsc::TryRecvError::Empty) => {}
        }

        match stream.next_frame() {
            Ok(Some(frame)) => {
                consecutive_errors = 0;
                shared.publish(frame);
            }
            Ok(None) => {
                trace!("No frame available (timeout)");
            }
            Err(e) => {
                consecutive_errors += 1;
                warn!(
                    "Frame capture failed ({}/{}): {}",
                    consecutive_errors, MAX_CONSECUTIVE_ERRORS, e
                );
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    error!("Camera stopped delivering frames, ending capture");
                    break;
                }
            }
        }
    }

    shared.running.store(false, Ordering::SeqCst);
    info!("Capture thread ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_updates_latest_and_notifies() {
        let shared = SharedState::new();
        let seen = Arc::new(AtomicU64::new(0));
        let seen_clone = seen.clone();
        shared.subscribers.write().insert(
            SubscriptionId::next(),
            Arc::new(move |_: &Arc<Frame>| {
                seen_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        shared.publish(Frame::new(2, 2, vec![0; 12], 1));
        shared.publish(Frame::new(2, 2, vec![0; 12], 2));

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(shared.latest.lock().as_ref().map(|f| f.sequence), Some(2));
        assert_eq!(shared.frame_count.load(Ordering::SeqCst), 2);
    }
}
