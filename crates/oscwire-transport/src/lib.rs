//! OSC transport clients behind one async contract.
//!
//! Every client implements [`OscTransport`]:
//! - [`UdpClient`] for datagrams, optionally bound to a feedback port
//! - [`StreamClient`] for TCP, raw TCP and serial devices, reassembling
//!   inbound packets with `oscwire_frame::OscStreamCodec`
//!
//! Connection events and inbound packets are delivered to a
//! [`TransportHandler`]. Pick the client with [`create_transport`] or let
//! [`configure`] validate a [`TransportConfig`] first.

pub mod endpoint;
pub mod error;
pub mod factory;
pub mod state;
pub mod stream;
pub mod traits;
pub mod udp;

pub use endpoint::{is_ip_address, Endpoint, Protocol, TransportConfig};
pub use error::{Result, TransportError};
pub use factory::{configure, create_transport};
pub use state::{ConnectionState, Status};
pub use stream::StreamClient;
pub use traits::{DatagramSink, NoopHandler, OscTransport, TransportHandler};
pub use udp::UdpClient;
