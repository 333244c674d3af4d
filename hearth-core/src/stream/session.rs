//! A single client stream session

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{trace, warn};
use uuid::Uuid;

use crate::capture::FrameSink;
use crate::encode::{QualityTier, encode_jpeg};
use crate::types::Frame;

/// Per-client consumer of the shared capture stream
///
/// Drops frames arriving faster than the target rate, rescales and
/// re-encodes the rest at the session's quality tier, and keeps only the
/// newest encoded frame.
pub struct StreamSession {
    id: Uuid,
    quality: QualityTier,
    frame_rate: u32,
    min_interval: Duration,
    started_at: DateTime<Utc>,
    frames_processed: AtomicU64,
    state: Mutex<SessionState>,
}

#[derive(Default)]
struct SessionState {
    /// When the last accepted frame arrived
    last_processed: Option<Instant>,
    /// Newest encoded JPEG
    latest: Option<Bytes>,
}

impl StreamSession {
    /// Create a session; `frame_rate` is raised to at least 1
    pub fn new(quality: QualityTier, frame_rate: u32) -> Self {
        let frame_rate = frame_rate.max(1);
        Self {
            id: Uuid::new_v4(),
            quality,
            frame_rate,
            min_interval: Duration::from_secs_f64(1.0 / frame_rate as f64),
            started_at: Utc::now(),
            frames_processed: AtomicU64::new(0),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn quality(&self) -> QualityTier {
        self.quality
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed.load(Ordering::Relaxed)
    }

    /// Newest encoded frame, never waits for a fresh one
    pub fn latest_frame(&self) -> Option<Bytes> {
        self.state.lock().latest.clone()
    }

    /// Handle a frame that arrived at `now`
    ///
    /// Returns true if the frame was encoded and stored.
    pub fn process_at(&self, frame: &Frame, now: Instant) -> bool {
        {
            let mut state = self.state.lock();
            if let Some(last) = state.last_processed {
                if now.saturating_duration_since(last) < self.min_interval {
                    trace!("Session {} dropped frame {}", self.id, frame.sequence);
                    return false;
                }
            }
            state.last_processed = Some(now);
        }

        // Encode outside the lock so readers are never held up
        match encode_jpeg(frame, self.quality.scale(), self.quality.compression()) {
            Ok(jpeg) => {
                self.state.lock().latest = Some(Bytes::from(jpeg));
                self.frames_processed.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                warn!(
                    "Session {} failed to encode frame {}: {}",
                    self.id, frame.sequence, e
                );
                false
            }
        }
    }
}

impl FrameSink for StreamSession {
    fn on_frame(&self, frame: &Arc<Frame>) {
        self.process_at(frame, Instant::now());
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("id", &self.id)
            .field("quality", &self.quality)
            .field("frame_rate", &self.frame_rate)
            .field("frames_processed", &self.frames_processed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(seq: u64) -> Frame {
        Frame::new(32, 16, vec![90; 32 * 16 * 3], seq)
    }

    #[test]
    fn test_fresh_session_has_no_frame() {
        let session = StreamSession::new(QualityTier::Medium, 15);
        assert!(session.latest_frame().is_none());
        assert_eq!(session.frames_processed(), 0);
    }

    #[test]
    fn test_rate_limit_within_one_second() {
        let session = StreamSession::new(QualityTier::Low, 10);
        let start = Instant::now();

        // 100 frames over one second
        for i in 0..100u64 {
            session.process_at(&frame(i + 1), start + Duration::from_millis(i * 10));
        }
        assert_eq!(session.frames_processed(), 10);
        assert!(session.latest_frame().is_some());
    }

    #[test]
    fn test_zero_rate_is_raised() {
        let session = StreamSession::new(QualityTier::High, 0);
        assert_eq!(session.frame_rate(), 1);
    }

    #[test]
    fn test_encode_failure_keeps_previous_frame() {
        let session = StreamSession::new(QualityTier::High, 30);
        let start = Instant::now();
        assert!(session.process_at(&frame(1), start));
        let first = session.latest_frame();

        let broken = Frame::new(32, 16, vec![0; 5], 2);
        assert!(!session.process_at(&broken, start + Duration::from_secs(1)));
        assert_eq!(session.latest_frame(), first);
        assert_eq!(session.frames_processed(), 1);
    }

    #[test]
    fn test_low_tier_scales_down() {
        let session = StreamSession::new(QualityTier::Low, 30);
        assert!(session.process_at(&frame(1), Instant::now()));
        let jpeg = session.latest_frame().unwrap();
        let decoded = image::load_from_memory_with_format(&jpeg, image::ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
    }
}
