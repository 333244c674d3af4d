//! Stream session registry
//!
//! Sessions share the single capture source. The registry starts capture
//! when the first session is created and stops it when the last one ends.

mod session;

pub use session::StreamSession;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::capture::CaptureSource;
use crate::encode::QualityTier;
use crate::types::SubscriptionId;

/// Summary of a session for listings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    pub id: Uuid,
    pub quality: QualityTier,
    pub frame_rate: u32,
    pub start_time: DateTime<Utc>,
    pub frames_processed: u64,
}

impl From<&StreamSession> for StreamInfo {
    fn from(session: &StreamSession) -> Self {
        Self {
            id: session.id(),
            quality: session.quality(),
            frame_rate: session.frame_rate(),
            start_time: session.started_at(),
            frames_processed: session.frames_processed(),
        }
    }
}

struct SessionEntry {
    session: Arc<StreamSession>,
    subscription: SubscriptionId,
}

/// Creates and destroys stream sessions
pub struct StreamRegistry {
    capture: Arc<CaptureSource>,
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    /// Serializes start/stop so capture runs exactly while sessions exist
    lifecycle: Mutex<()>,
}

impl StreamRegistry {
    pub fn new(capture: Arc<CaptureSource>) -> Self {
        Self {
            capture,
            sessions: RwLock::new(HashMap::new()),
            lifecycle: Mutex::new(()),
        }
    }

    /// The shared capture source
    pub fn capture(&self) -> &Arc<CaptureSource> {
        &self.capture
    }

    /// Create a session, starting capture if needed
    ///
    /// Returns `None` if the frame rate is zero or capture could not start.
    pub fn start_stream(&self, quality: QualityTier, frame_rate: u32) -> Option<Uuid> {
        if frame_rate == 0 {
            warn!("Refusing stream with a frame rate of 0");
            return None;
        }

        let _guard = self.lifecycle.lock();
        if !self.capture.start() {
            error!("Cannot start {} stream: camera unavailable", quality);
            return None;
        }

        let session = Arc::new(StreamSession::new(quality, frame_rate));
        let id = session.id();
        let subscription = self.capture.subscribe(session.clone());
        self.sessions
            .write()
            .insert(id, SessionEntry { session, subscription });

        info!("Stream {} started ({} @ {}fps)", id, quality, frame_rate);
        Some(id)
    }

    /// End a session, stopping capture if it was the last one
    ///
    /// Returns false for an unknown id.
    pub fn stop_stream(&self, id: Uuid) -> bool {
        let _guard = self.lifecycle.lock();
        let Some(entry) = self.sessions.write().remove(&id) else {
            debug!("Stop requested for unknown stream {}", id);
            return false;
        };

        self.capture.unsubscribe(entry.subscription);
        info!(
            "Stream {} stopped after {} frames",
            id,
            entry.session.frames_processed()
        );

        if self.sessions.read().is_empty() {
            debug!("Last stream ended, stopping capture");
            self.capture.stop();
        }
        true
    }

    /// Newest encoded frame of a session
    pub fn get_frame(&self, id: Uuid) -> Option<Bytes> {
        let session = self.session(id)?;
        session.latest_frame()
    }

    /// Look up a session
    pub fn session(&self, id: Uuid) -> Option<Arc<StreamSession>> {
        self.sessions.read().get(&id).map(|e| e.session.clone())
    }

    /// All sessions, oldest first
    pub fn list_sessions(&self) -> Vec<StreamInfo> {
        let mut list: Vec<StreamInfo> = self
            .sessions
            .read()
            .values()
            .map(|e| StreamInfo::from(e.session.as_ref()))
            .collect();
        list.sort_by_key(|info| info.start_time);
        list
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// End every session and release the camera
    pub fn stop_all(&self) -> usize {
        let _guard = self.lifecycle.lock();
        let drained: Vec<SessionEntry> = self.sessions.write().drain().map(|(_, e)| e).collect();
        for entry in &drained {
            self.capture.unsubscribe(entry.subscription);
        }
        self.capture.stop();

        if !drained.is_empty() {
            info!("Stopped {} streams", drained.len());
        }
        drained.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureSettings, SyntheticBackend};

    fn registry() -> StreamRegistry {
        let capture = CaptureSource::new(
            Arc::new(SyntheticBackend::new()),
            CaptureSettings::new(32, 24, 60),
        );
        StreamRegistry::new(Arc::new(capture))
    }

    #[test]
    fn test_zero_rate_rejected() {
        let registry = registry();
        assert!(registry.start_stream(QualityTier::Low, 0).is_none());
        assert!(!registry.capture().is_running());
    }

    #[test]
    fn test_stop_unknown_stream() {
        let registry = registry();
        assert!(!registry.stop_stream(Uuid::new_v4()));
    }

    #[test]
    fn test_stop_all_releases_camera() {
        let registry = registry();
        registry.start_stream(QualityTier::Low, 5).unwrap();
        registry.start_stream(QualityTier::High, 5).unwrap();
        assert_eq!(registry.stop_all(), 2);
        assert!(registry.is_empty());
        assert!(!registry.capture().is_running());
        assert_eq!(registry.capture().subscriber_count(), 0);
    }
}
