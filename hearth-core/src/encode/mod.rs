//! Still-image encoding for stream sessions and snapshots
//!
//! This module provides:
//! - The fixed quality tiers (scale + compression factor)
//! - Frame rescaling
//! - JPEG encoding of raw RGB frames via the `image` crate

mod jpeg;
mod scaler;

pub use jpeg::{encode_jpeg, jpeg_quality};
pub use scaler::scaled_size;

use serde::{Deserialize, Serialize};

/// Stream quality tier
///
/// The scale and compression factors are part of the public contract and are
/// not configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Quarter resolution, heavy compression
    Low,
    /// Half resolution (default)
    #[default]
    Medium,
    /// Full resolution, light compression
    High,
}

impl QualityTier {
    /// Linear scale factor applied to both frame dimensions
    pub fn scale(&self) -> f64 {
        match self {
            Self::Low => 0.25,
            Self::Medium => 0.5,
            Self::High => 1.0,
        }
    }

    /// Compression factor in `0.0..=1.0`, higher keeps more detail
    pub fn compression(&self) -> f64 {
        match self {
            Self::Low => 0.5,
            Self::Medium => 0.7,
            Self::High => 0.9,
        }
    }

    /// Lowercase name as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for QualityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Unknown quality: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_constants() {
        assert_eq!(QualityTier::Low.scale(), 0.25);
        assert_eq!(QualityTier::Low.compression(), 0.5);
        assert_eq!(QualityTier::Medium.scale(), 0.5);
        assert_eq!(QualityTier::Medium.compression(), 0.7);
        assert_eq!(QualityTier::High.scale(), 1.0);
        assert_eq!(QualityTier::High.compression(), 0.9);
    }

    #[test]
    fn test_tier_from_str() {
        assert_eq!("low".parse::<QualityTier>().ok(), Some(QualityTier::Low));
        assert_eq!("MEDIUM".parse::<QualityTier>().ok(), Some(QualityTier::Medium));
        assert_eq!("high".parse::<QualityTier>().ok(), Some(QualityTier::High));
        assert!("ultra".parse::<QualityTier>().is_err());
    }

    #[test]
    fn test_tier_serde_lowercase() {
        let json = serde_json::to_string(&QualityTier::High).unwrap();
        assert_eq!(json, "\"high\"");
        let parsed: QualityTier = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(parsed, QualityTier::Low);
    }
}
