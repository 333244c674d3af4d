//! Integration tests for the stream session registry

mod mocks;

use hearth_core::capture::{CaptureSettings, CaptureSource};
use hearth_core::encode::QualityTier;
use hearth_core::stream::StreamRegistry;
use mocks::{ScriptedBackend, create_gradient_frame, wait_until};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const WAIT: Duration = Duration::from_secs(3);

fn registry() -> (Arc<ScriptedBackend>, StreamRegistry) {
    let backend = Arc::new(ScriptedBackend::new());
    let capture = CaptureSource::new(backend.clone(), CaptureSettings::new(64, 48, 30));
    (backend, StreamRegistry::new(Arc::new(capture)))
}

#[test]
fn test_capture_runs_while_sessions_exist() {
    let (_backend, registry) = registry();
    assert!(!registry.capture().is_running());

    let a = registry.start_stream(QualityTier::Low, 10).unwrap();
    assert!(registry.capture().is_running());
    let b = registry.start_stream(QualityTier::High, 10).unwrap();
    assert!(registry.capture().is_running());

    assert!(registry.stop_stream(a));
    assert!(registry.capture().is_running());
    assert_eq!(registry.session_count(), 1);

    assert!(registry.stop_stream(b));
    assert!(!registry.capture().is_running());
    assert!(registry.is_empty());

    // Starting again reopens the camera
    let c = registry.start_stream(QualityTier::Medium, 5).unwrap();
    assert!(registry.capture().is_running());
    assert!(registry.stop_stream(c));
    assert!(!registry.capture().is_running());
}

#[test]
fn test_stop_unknown_session_keeps_capture() {
    let (_backend, registry) = registry();
    registry.start_stream(QualityTier::Low, 10).unwrap();
    assert!(!registry.stop_stream(Uuid::new_v4()));
    assert!(registry.capture().is_running());
    assert_eq!(registry.session_count(), 1);
}

#[test]
fn test_fresh_session_has_no_frame() {
    let (_backend, registry) = registry();
    let id = registry.start_stream(QualityTier::Medium, 15).unwrap();
    assert!(registry.get_frame(id).is_none());
    assert!(registry.get_frame(Uuid::new_v4()).is_none());
}

#[test]
fn test_sessions_have_distinct_ids_and_counters() {
    let (backend, registry) = registry();
    let slow = registry.start_stream(QualityTier::Low, 1).unwrap();
    let fast = registry.start_stream(QualityTier::High, 1000).unwrap();
    assert_ne!(slow, fast);

    let feed = backend.feed();
    for seq in 1..=5 {
        feed.push(create_gradient_frame(64, 48, seq));
        std::thread::sleep(Duration::from_millis(10));
    }

    let fast_session = registry.session(fast).unwrap();
    let slow_session = registry.session(slow).unwrap();
    assert!(wait_until(WAIT, || fast_session.frames_processed() == 5));
    assert_eq!(slow_session.frames_processed(), 1);
}

#[test]
fn test_frames_are_scaled_per_quality() {
    let (backend, registry) = registry();
    let low = registry.start_stream(QualityTier::Low, 30).unwrap();
    let high = registry.start_stream(QualityTier::High, 30).unwrap();

    backend.feed().push(create_gradient_frame(64, 48, 1));
    assert!(wait_until(WAIT, || {
        registry.get_frame(low).is_some() && registry.get_frame(high).is_some()
    }));

    let dims = |bytes: bytes::Bytes| {
        let image = image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg).unwrap();
        (image.width(), image.height())
    };
    assert_eq!(dims(registry.get_frame(low).unwrap()), (16, 12));
    assert_eq!(dims(registry.get_frame(high).unwrap()), (64, 48));
}

#[test]
fn test_start_fails_without_camera() {
    let (backend, registry) = registry();
    backend.set_fail_open(true);
    assert!(registry.start_stream(QualityTier::Medium, 15).is_none());
    assert!(registry.is_empty());
    assert!(!registry.capture().is_running());
}

#[test]
fn test_list_sessions() {
    let (_backend, registry) = registry();
    let a = registry.start_stream(QualityTier::Low, 5).unwrap();
    std::thread::sleep(Duration::from_millis(2));
    let b = registry.start_stream(QualityTier::High, 20).unwrap();

    let list = registry.list_sessions();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].id, a);
    assert_eq!(list[0].quality, QualityTier::Low);
    assert_eq!(list[0].frame_rate, 5);
    assert_eq!(list[1].id, b);
    assert_eq!(list[1].frames_processed, 0);

    let json = serde_json::to_value(&list[1]).unwrap();
    assert_eq!(json["quality"], "high");
    assert_eq!(json["frameRate"], 20);
    assert!(json.get("startTime").is_some());
    assert!(json.get("framesProcessed").is_some());
}

#[test]
fn test_failed_camera_switch_keeps_streaming() {
    let (backend, registry) = registry();
    let id = registry.start_stream(QualityTier::Low, 30).unwrap();
    let capture = registry.capture();

    backend.set_fail_open(true);
    assert!(!capture.select_device("cam1"));
    assert!(capture.is_running());
    assert_eq!(capture.current_device().map(|d| d.id), Some("cam0".to_string()));
    assert_eq!(backend.opened_devices(), vec!["cam0".to_string()]);

    backend.feed().push(create_gradient_frame(64, 48, 1));
    assert!(wait_until(WAIT, || registry.get_frame(id).is_some()));

    backend.set_fail_open(false);
    assert!(capture.select_device("cam1"));
    assert!(capture.is_running());
    assert_eq!(capture.current_device().map(|d| d.id), Some("cam1".to_string()));
    assert_eq!(registry.session_count(), 1);
}
