//! OSC 1.0 packet codec and stream reassembly.
//!
//! This is the wire layer of oscwire:
//! - [`codec`] encodes and decodes messages and bundles (4-byte aligned,
//!   big-endian, typed arguments including the `m` MIDI tag)
//! - [`framer`] recovers packet boundaries from an unframed byte stream by
//!   speculative decoding, or from SLIP delimiters when configured
//!
//! Datagram transports hand each datagram straight to [`decode_packet`];
//! stream transports go through [`StreamFramer`] or, with the `async`
//! feature, [`OscStreamCodec`].

pub mod codec;
pub mod error;
pub mod framer;
pub mod slip;
#[cfg(feature = "async")]
pub mod stream_codec;

pub use codec::{
    decode_message, decode_packet, encode_message, encode_packet, encode_packet_into, OscArg,
    OscBundle, OscMessage, OscPacket, TimeTag, BUNDLE_TAG,
};
pub use error::{FrameError, Result};
pub use framer::{
    decode_stream_packet, next_packet, FramerConfig, StreamFramer, StreamFraming,
    DEFAULT_MAX_BUFFER,
};
#[cfg(feature = "async")]
pub use stream_codec::OscStreamCodec;
