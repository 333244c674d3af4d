//! Error types for Hearth

use thiserror::Error;

/// Result type alias using HearthError
pub type Result<T> = std::result::Result<T, HearthError>;

/// Main error type for Hearth operations
#[derive(Debug, Error)]
pub enum HearthError {
    /// Camera device could not be opened or read
    #[error("Camera error: {0}")]
    Camera(String),

    /// No camera matches the requested id, or none is attached
    #[error("Camera not found: {0}")]
    DeviceNotFound(String),

    /// Frame scaling or JPEG encoding failed
    #[error("Encoder error: {0}")]
    Encoder(String),

    /// Authorized-key list could not be read or written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Access listener could not be started
    #[error("Listener error: {0}")]
    Listener(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied something unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<HearthError>,
    },
}

impl HearthError {
    /// Create a camera error
    pub fn camera(msg: impl Into<String>) -> Self {
        Self::Camera(msg.into())
    }

    /// Create an encoder error
    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a listener error
    pub fn listener(msg: impl Into<String>) -> Self {
        Self::Listener(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid-input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any context layers
    pub fn root(&self) -> &HearthError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

// Conversions from external error types

impl From<image::ImageError> for HearthError {
    fn from(err: image::ImageError) -> Self {
        Self::Encoder(err.to_string())
    }
}

impl From<base64::DecodeError> for HearthError {
    fn from(err: base64::DecodeError) -> Self {
        Self::InvalidInput(format!("invalid base64: {}", err))
    }
}

impl From<toml::de::Error> for HearthError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("Failed to parse config file: {}", err))
    }
}
