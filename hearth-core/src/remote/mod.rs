//! Remote-access registry
//!
//! This module handles:
//! - The persisted list of authorized public keys
//! - Bookkeeping of active remote connections
//! - Start/stop of the access listener through an `AccessTransport`
//!
//! No secure-shell protocol is implemented here.

mod keys;
mod transport;

pub use keys::{AuthorizedKey, KeyStore, decode_key_data};
pub use transport::{AccessTransport, ActiveListener, MetadataTransport, TcpTransport};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::Result;

/// Default access listener port
pub const DEFAULT_SSH_PORT: u16 = 2222;

/// A tracked remote connection (memory only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConnection {
    pub id: Uuid,
    pub client_address: String,
    pub username: String,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Listener state for status reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStatus {
    pub running: bool,
    pub port: Option<u16>,
    pub connections: usize,
}

/// Authorized keys, active connections and the access listener
pub struct RemoteAccessRegistry {
    store: KeyStore,
    transport: Box<dyn AccessTransport>,
    /// Guards both the in-memory list and the write to disk
    keys: Mutex<Vec<AuthorizedKey>>,
    /// Lock order: `listener` before `connections`
    listener: Mutex<Option<Box<dyn ActiveListener>>>,
    connections: RwLock<HashMap<Uuid, RemoteConnection>>,
}

impl RemoteAccessRegistry {
    /// Registry with an empty key list
    pub fn new(store: KeyStore, transport: Box<dyn AccessTransport>) -> Self {
        Self::with_keys(store, transport, Vec::new())
    }

    /// Registry with the keys currently persisted in `store`
    pub fn load(store: KeyStore, transport: Box<dyn AccessTransport>) -> Result<Self> {
        let keys = store.load()?;
        Ok(Self::with_keys(store, transport, keys))
    }

    fn with_keys(store: KeyStore, transport: Box<dyn AccessTransport>, keys: Vec<AuthorizedKey>) -> Self {
        Self {
            store,
            transport,
            keys: Mutex::new(keys),
            listener: Mutex::new(None),
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Backing key store
    pub fn store(&self) -> &KeyStore {
        &self.store
    }

    /// Start the access listener. Idempotent.
    ///
    /// Returns false if the transport cannot listen on `port`.
    pub fn start(&self, port: u16) -> bool {
        let mut listener = self.listener.lock();
        if let Some(active) = listener.as_ref() {
            if active.port() != port {
                debug!(
                    "Access listener already running on port {}, ignoring port {}",
                    active.port(),
                    port
                );
            }
            return true;
        }

        match self.transport.listen(port) {
            Ok(active) => {
                info!(
                    "Remote access listener started on port {} ({})",
                    active.port(),
                    self.transport.name()
                );
                *listener = Some(active);
                true
            }
            Err(e) => {
                error!("Failed to start remote access on port {}: {}", port, e);
                false
            }
        }
    }

    /// Stop the listener and drop every tracked connection. Idempotent.
    pub fn stop(&self) {
        let mut listener = self.listener.lock();
        let closed = {
            let mut connections = self.connections.write();
            let count = connections.len();
            connections.clear();
            count
        };

        if let Some(mut active) = listener.take() {
            active.close();
            info!(
                "Remote access listener stopped on port {}, closed {} connections",
                active.port(),
                closed
            );
        }
    }

    pub fn is_running(&self) -> bool {
        self.listener.lock().is_some()
    }

    /// Port the listener is bound to
    pub fn port(&self) -> Option<u16> {
        self.listener.lock().as_ref().map(|l| l.port())
    }

    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    pub fn status(&self) -> RemoteStatus {
        let listener = self.listener.lock();
        RemoteStatus {
            running: listener.is_some(),
            port: listener.as_ref().map(|l| l.port()),
            connections: self.connections.read().len(),
        }
    }

    /// Add and persist a key
    ///
    /// Returns `None` if persistence fails; the key is not kept.
    pub fn add_authorized_key(&self, key_data: Vec<u8>, comment: Option<String>) -> Option<AuthorizedKey> {
        match self.try_add_authorized_key(key_data, comment) {
            Ok(key) => Some(key),
            Err(e) => {
                error!("Failed to add authorized key: {}", e);
                None
            }
        }
    }

    /// Add and persist a key, reporting the persistence error
    pub fn try_add_authorized_key(
        &self,
        key_data: Vec<u8>,
        comment: Option<String>,
    ) -> Result<AuthorizedKey> {
        let key = AuthorizedKey::new(key_data, comment);
        let mut keys = self.keys.lock();
        keys.push(key.clone());
        if let Err(e) = self.store.save(&keys) {
            keys.pop();
            return Err(e);
        }

        info!("Added authorized key {}", key.id);
        Ok(key)
    }

    /// Remove and persist; false if the id is unknown or the write fails
    pub fn remove_authorized_key(&self, id: Uuid) -> bool {
        match self.try_remove_authorized_key(id) {
            Ok(removed) => removed,
            Err(e) => {
                error!("Failed to remove authorized key {}: {}", id, e);
                false
            }
        }
    }

    /// Remove and persist; `Ok(false)` if the id is unknown
    pub fn try_remove_authorized_key(&self, id: Uuid) -> Result<bool> {
        let mut keys = self.keys.lock();
        let Some(index) = keys.iter().position(|k| k.id == id) else {
            debug!("Authorized key {} not found", id);
            return Ok(false);
        };

        let removed = keys.remove(index);
        if let Err(e) = self.store.save(&keys) {
            keys.insert(index, removed);
            return Err(e);
        }

        info!("Removed authorized key {}", id);
        Ok(true)
    }

    pub fn list_authorized_keys(&self) -> Vec<AuthorizedKey> {
        self.keys.lock().clone()
    }

    pub fn key_count(&self) -> usize {
        self.keys.lock().len()
    }

    /// Active connections, oldest first
    pub fn list_active_connections(&self) -> Vec<RemoteConnection> {
        let mut list: Vec<RemoteConnection> = self.connections.read().values().cloned().collect();
        list.sort_by_key(|c| c.connected_at);
        list
    }

    /// Record a connection accepted by a transport adapter
    ///
    /// Returns `None` while the listener is stopped.
    pub fn register_connection(
        &self,
        client_address: impl Into<String>,
        username: impl Into<String>,
    ) -> Option<Uuid> {
        let listener = self.listener.lock();
        if listener.is_none() {
            warn!("Rejecting connection: remote access listener is not running");
            return None;
        }

        let now = Utc::now();
        let connection = RemoteConnection {
            id: Uuid::new_v4(),
            client_address: client_address.into(),
            username: username.into(),
            connected_at: now,
            last_activity: now,
        };
        let id = connection.id;
        info!(
            "Remote connection {} from {} as {}",
            id, connection.client_address, connection.username
        );
        self.connections.write().insert(id, connection);
        Some(id)
    }

    /// Refresh `last_activity`; false if the connection is unknown
    pub fn touch_connection(&self, id: Uuid) -> bool {
        match self.connections.write().get_mut(&id) {
            Some(connection) => {
                connection.last_activity = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Forget a single connection; false if unknown
    pub fn close_connection(&self, id: Uuid) -> bool {
        let removed = self.connections.write().remove(&id);
        match removed {
            Some(connection) => {
                info!(
                    "Remote connection {} from {} closed",
                    id, connection.client_address
                );
                true
            }
            None => false,
        }
    }
}

impl Drop for RemoteAccessRegistry {
    fn drop(&mut self) {
        self.stop();
    }
}
