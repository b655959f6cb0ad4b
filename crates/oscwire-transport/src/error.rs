use std::net::SocketAddr;
use std::time::Duration;

use oscwire_frame::FrameError;

/// Errors that can occur in OSC transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Missing or invalid configuration; no connection is attempted.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Hostname lookup failed or produced no IPv4 address.
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        source: std::io::Error,
    },

    /// Failed to bind the local socket.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to connect to the remote device.
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        source: std::io::Error,
    },

    /// A bounded connect attempt did not complete in time.
    #[error("connect to {target} timed out after {timeout:?}")]
    ConnectTimeout { target: String, timeout: Duration },

    /// The transport has no open connection to use.
    #[error("transport not connected")]
    NotConnected,

    /// An I/O error occurred on an open connection.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or stream reassembly failed.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}

impl TransportError {
    /// Whether this error belongs to the configuration family
    /// (reported as `bad_config` rather than a connection failure).
    pub fn is_config(&self) -> bool {
        matches!(self, TransportError::Config(_) | TransportError::Resolve { .. })
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
