//! Authorized public keys and their on-disk store
//!
//! Keys live in a JSON array at `~/.local/share/hearth/authorized_keys.json`.
//! The whole list is rewritten on every change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{HearthError, Result};

/// A public key allowed to open remote sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizedKey {
    /// Unique identifier
    pub id: Uuid,
    /// Raw key material (base64 on disk)
    #[serde(with = "base64_bytes")]
    pub key_data: Vec<u8>,
    /// Free-form label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// When the key was added
    pub created_at: DateTime<Utc>,
}

impl AuthorizedKey {
    /// New key with a fresh id and the current time
    pub fn new(key_data: Vec<u8>, comment: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key_data,
            comment,
            created_at: Utc::now(),
        }
    }
}

/// Decode base64 key material supplied by a client
///
/// Surrounding whitespace is ignored; empty keys are rejected.
pub fn decode_key_data(encoded: &str) -> Result<Vec<u8>> {
    use base64::Engine;

    let key_data = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
    if key_data.is_empty() {
        return Err(HearthError::invalid_input("key must not be empty"));
    }
    Ok(key_data)
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// JSON file holding the authorized-key list
#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location
    pub fn at_default_path() -> Self {
        Self::new(Self::default_path())
    }

    /// Get the default key file path
    pub fn default_path() -> PathBuf {
        if let Some(data_dir) = dirs::data_dir() {
            data_dir.join("hearth").join("authorized_keys.json")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("hearth")
                .join("authorized_keys.json")
        } else {
            PathBuf::from("/var/lib/hearth/authorized_keys.json")
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the key list; a missing file is an empty list
    pub fn load(&self) -> Result<Vec<AuthorizedKey>> {
        if !self.path.exists() {
            debug!("Key file not found at {:?}, starting empty", self.path);
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            HearthError::persistence(format!("Failed to read {:?}: {}", self.path, e))
        })?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<AuthorizedKey> = serde_json::from_str(&content).map_err(|e| {
            HearthError::persistence(format!("Failed to parse {:?}: {}", self.path, e))
        })?;

        info!("Loaded {} authorized keys from {:?}", keys.len(), self.path);
        Ok(keys)
    }

    /// Replace the stored list
    ///
    /// Writes a sibling temporary file and renames it over the old one, so a
    /// failed write leaves the previous list intact.
    pub fn save(&self, keys: &[AuthorizedKey]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    HearthError::persistence(format!("Failed to create {:?}: {}", parent, e))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(keys)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .map_err(|e| HearthError::persistence(format!("Failed to write {:?}: {}", tmp, e)))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            HearthError::persistence(format!("Failed to replace {:?}: {}", self.path, e))
        })?;

        debug!("Saved {} authorized keys to {:?}", keys.len(), self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_data_is_base64_on_disk() {
        let key = AuthorizedKey::new(b"ssh-ed25519 AAAA".to_vec(), None);
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["keyData"], "c3NoLWVkMjU1MTkgQUFBQQ==");
        assert!(json.get("comment").is_none());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::new(dir.path().join("keys.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_store_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyStore::new(dir.path().join("nested").join("keys.json"));
        let keys = vec![
            AuthorizedKey::new(vec![1, 2, 3], Some("laptop".to_string())),
            AuthorizedKey::new(vec![4, 5], None),
        ];

        store.save(&keys).unwrap();
        assert_eq!(store.load().unwrap(), keys);
        assert!(!dir.path().join("nested").join("keys.json.tmp").exists());
    }

    #[test]
    fn test_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = KeyStore::new(path).load().unwrap_err();
        assert!(matches!(err, HearthError::Persistence(_)));
    }

    #[test]
    fn test_decode_key_data() {
        assert_eq!(decode_key_data(" c3NoLWVkMjU1MTkgQUFBQQ==\n").unwrap(), b"ssh-ed25519 AAAA");
        assert!(matches!(decode_key_data("not base64!"), Err(HearthError::InvalidInput(_))));
        assert!(matches!(decode_key_data("  "), Err(HearthError::InvalidInput(_))));
    }
}
