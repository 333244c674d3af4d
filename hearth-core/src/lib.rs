//! Hearth Core Library
//!
//! Home-server camera streaming and remote-access control plane.
//!
//! This library provides:
//! - A shared camera capture source with frame fan-out
//! - Per-client stream sessions with rate limiting and JPEG re-encoding
//! - An authorized-key and connection registry for remote access
//! - An authenticated HTTP API over all of the above
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐    ┌─────────────────┐    ┌──────────────┐
//! │ Capture Source │───▶│ Stream Sessions │◀───│ HTTP API     │
//! │ (camera thread)│    │ (N, per client) │    │ (axum)       │
//! └────────────────┘    └─────────────────┘    └──────┬───────┘
//!                                                     │
//!                                         ┌───────────▼───────────┐
//!                                         │ Remote-Access Registry│
//!                                         └───────────────────────┘
//! ```

pub mod api;
pub mod capture;
pub mod config;
pub mod encode;
pub mod error;
pub mod remote;
pub mod server;
pub mod stream;
pub mod types;

pub use capture::{BackendKind, CaptureSettings, CaptureSource};
pub use config::{ConfigFile, ServerConfig};
pub use encode::QualityTier;
pub use error::{HearthError, Result};
pub use remote::RemoteAccessRegistry;
pub use server::HomeServer;
pub use stream::StreamRegistry;
pub use types::{CameraDevice, CameraPosition, Frame};
