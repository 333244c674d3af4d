//! Pluggable transports for the remote-access listener
//!
//! Hearth does not speak the secure-shell protocol itself. A transport only
//! claims the listening port; session handling belongs to whatever adapter
//! sits on top and reports connections back to the registry.

use std::net::{IpAddr, Ipv4Addr, TcpListener};
use tracing::debug;

use crate::error::{HearthError, Result};

/// Opens the access listener on a port
pub trait AccessTransport: Send + Sync {
    /// Short transport name for logs
    fn name(&self) -> &str;

    /// Claim `port` and begin listening
    fn listen(&self, port: u16) -> Result<Box<dyn ActiveListener>>;
}

/// A listening endpoint, released on `close` or drop
pub trait ActiveListener: Send + Sync {
    /// Port actually bound
    fn port(&self) -> u16;

    /// Stop listening. Idempotent.
    fn close(&mut self);
}

/// Bookkeeping-only transport; nothing is bound
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataTransport;

impl AccessTransport for MetadataTransport {
    fn name(&self) -> &str {
        "metadata"
    }

    fn listen(&self, port: u16) -> Result<Box<dyn ActiveListener>> {
        if port == 0 {
            return Err(HearthError::listener("port 0 is not a valid listener port"));
        }
        Ok(Box::new(MetadataListener { port }))
    }
}

struct MetadataListener {
    port: u16,
}

impl ActiveListener for MetadataListener {
    fn port(&self) -> u16 {
        self.port
    }

    fn close(&mut self) {}
}

/// Binds and holds a TCP socket so port conflicts surface on start
///
/// Port 0 binds an ephemeral port.
#[derive(Debug, Clone, Copy)]
pub struct TcpTransport {
    bind: IpAddr,
}

impl TcpTransport {
    pub fn new(bind: IpAddr) -> Self {
        Self { bind }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

impl AccessTransport for TcpTransport {
    fn name(&self) -> &str {
        "tcp"
    }

    fn listen(&self, port: u16) -> Result<Box<dyn ActiveListener>> {
        let listener = TcpListener::bind((self.bind, port)).map_err(|e| {
            HearthError::listener(format!("Failed to bind {}:{}: {}", self.bind, port, e))
        })?;
        let port = listener.local_addr()?.port();
        debug!("Access listener bound on {}:{}", self.bind, port);

        Ok(Box::new(TcpActiveListener {
            listener: Some(listener),
            port,
        }))
    }
}

struct TcpActiveListener {
    listener: Option<TcpListener>,
    port: u16,
}

impl ActiveListener for TcpActiveListener {
    fn port(&self) -> u16 {
        self.port
    }

    fn close(&mut self) {
        if self.listener.take().is_some() {
            debug!("Released access listener port {}", self.port);
        }
    }
}
