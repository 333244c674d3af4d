//! Integration tests for error handling

use hearth_core::error::{HearthError, Result, ResultExt};

#[test]
fn test_error_context_chaining() {
    let base_error = HearthError::camera("device busy");
    let with_context = base_error.with_context("Opening camera cam0");

    let msg = format!("{}", with_context);
    assert!(msg.contains("Opening camera cam0"));
    assert!(msg.contains("device busy"));
}

#[test]
fn test_root_skips_context_layers() {
    let err = HearthError::persistence("disk full")
        .with_context("Saving keys")
        .with_context("Adding key");
    assert!(matches!(err.root(), HearthError::Persistence(_)));
}

#[test]
fn test_result_ext_context() {
    let result: Result<()> = Err(HearthError::listener("address in use"));
    let with_context = result.context("Starting remote access");

    let err = with_context.unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Starting remote access"));
    assert!(msg.contains("address in use"));
}

#[test]
fn test_error_display() {
    assert_eq!(
        HearthError::DeviceNotFound("cam9".to_string()).to_string(),
        "Camera not found: cam9"
    );
    assert_eq!(
        HearthError::invalid_input("empty key").to_string(),
        "Invalid input: empty key"
    );
}

#[test]
fn test_conversions() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    assert!(matches!(HearthError::from(io), HearthError::Io(_)));

    let json = serde_json::from_str::<u32>("nope").unwrap_err();
    assert!(matches!(HearthError::from(json), HearthError::Json(_)));

    let toml = toml::from_str::<toml::Value>("= broken").unwrap_err();
    assert!(matches!(HearthError::from(toml), HearthError::Config(_)));

    use base64::Engine;
    let b64 = base64::engine::general_purpose::STANDARD
        .decode("***")
        .unwrap_err();
    assert!(matches!(HearthError::from(b64), HearthError::InvalidInput(_)));
}

#[test]
fn test_error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HearthError>();
}
