use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

use crate::codec::{encode_packet, encode_packet_into, OscMessage, OscPacket};
use crate::error::{FrameError, Result};
use crate::framer::{next_packet, FramerConfig, StreamFraming};
use crate::slip::slip_encode;

/// `tokio_util` codec for OSC over byte streams (TCP, serial).
///
/// Decoding runs the same reassembly step as [`crate::StreamFramer`]. A
/// buffer overflow is logged and the stream keeps going; only I/O errors
/// end a `FramedRead`.
#[derive(Debug, Clone, Default)]
pub struct OscStreamCodec {
    config: FramerConfig,
}

impl OscStreamCodec {
    pub fn new(config: FramerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FramerConfig {
        &self.config
    }
}

impl Decoder for OscStreamCodec {
    type Item = OscPacket;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<OscPacket>> {
        match next_packet(src, &self.config) {
            Err(err @ FrameError::BufferOverflow { .. }) => {
                warn!(%err, "reassembly buffer discarded");
                Ok(None)
            }
            other => other,
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<OscPacket>> {
        if let Some(packet) = self.decode(src)? {
            return Ok(Some(packet));
        }
        if !src.is_empty() {
            debug!(discarded = src.len(), "stream closed with partial packet");
            src.clear();
        }
        Ok(None)
    }
}

impl Encoder<OscPacket> for OscStreamCodec {
    type Error = FrameError;

    fn encode(&mut self, item: OscPacket, dst: &mut BytesMut) -> Result<()> {
        match self.config.framing {
            StreamFraming::Unframed => encode_packet_into(&item, dst),
            StreamFraming::Slip => slip_encode(&encode_packet(&item), dst),
        }
        Ok(())
    }
}

impl Encoder<OscMessage> for OscStreamCodec {
    type Error = FrameError;

    fn encode(&mut self, item: OscMessage, dst: &mut BytesMut) -> Result<()> {
        Encoder::<OscPacket>::encode(self, OscPacket::Message(item), dst)
    }
}
