use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;
use oscwire_frame::{OscMessage, OscPacket};

use crate::endpoint::Protocol;
use crate::error::Result;
use crate::state::{ConnectionState, Status};

/// Common contract for every OSC transport client.
///
/// All methods take `&self`; clients keep their connection behind interior
/// mutability so one instance can be shared as `Arc<dyn OscTransport>`.
#[async_trait]
pub trait OscTransport: Send + Sync {
    /// Bind or connect. Calling `open` on an open client is a no-op.
    async fn open(&self) -> Result<()>;

    /// Release the socket or device. Always safe to call.
    async fn close(&self) -> Result<()>;

    /// Encode and send one message, opening the client first if needed.
    async fn send(&self, message: &OscMessage) -> Result<()>;

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    fn state(&self) -> ConnectionState;

    fn protocol(&self) -> Protocol;
}

/// Receives connection events and inbound packets from a transport.
///
/// Callbacks run on the transport's reader task and must not block.
pub trait TransportHandler: Send + Sync {
    fn on_status(&self, _status: Status) {}

    /// A decoded packet; `from` is the sender for datagram transports.
    fn on_packet(&self, _packet: OscPacket, _from: Option<SocketAddr>) {}

    fn on_sent(&self, _message: &OscMessage) {}
}

/// Handler that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl TransportHandler for NoopHandler {}

/// Outbound path for UDP datagrams supplied by a host.
///
/// A host that already owns a generic UDP sender can route outgoing OSC
/// through it instead of the client's own socket.
#[async_trait]
pub trait DatagramSink: Send + Sync {
    async fn send_to(&self, datagram: Bytes, target: SocketAddr) -> Result<()>;
}
