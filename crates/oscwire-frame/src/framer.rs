use bytes::BytesMut;
use tracing::{debug, trace, warn};

use crate::codec::{decode_packet, OscPacket};
use crate::error::{FrameError, Result};
use crate::slip;

/// Default ceiling for a connection's reassembly buffer: 16 MiB.
pub const DEFAULT_MAX_BUFFER: usize = 16 * 1024 * 1024;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// How packet boundaries are found on a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamFraming {
    /// No delimiters: boundaries come from the OSC structure itself.
    #[default]
    Unframed,
    /// OSC 1.1 style SLIP delimiters.
    Slip,
}

/// Configuration for stream reassembly.
#[derive(Debug, Clone)]
pub struct FramerConfig {
    /// Boundary detection strategy.
    pub framing: StreamFraming,
    /// Buffered bytes allowed without a complete packet before the buffer
    /// is discarded. Default: 16 MiB.
    pub max_buffer_size: usize,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            framing: StreamFraming::Unframed,
            max_buffer_size: DEFAULT_MAX_BUFFER,
        }
    }
}

/// Take the next complete packet off the front of `src`, if any.
///
/// Dispatches on the configured framing. Returns `Ok(None)` when more bytes
/// are needed and `Err(FrameError::BufferOverflow)` after discarding a
/// buffer that outgrew `max_buffer_size`.
pub fn next_packet(src: &mut BytesMut, config: &FramerConfig) -> Result<Option<OscPacket>> {
    match config.framing {
        StreamFraming::Unframed => decode_stream_packet(src, config.max_buffer_size),
        StreamFraming::Slip => decode_slip_packet(src, config.max_buffer_size),
    }
}

/// One step of self-delimiting reassembly.
///
/// Speculatively decodes the whole buffer. On success the decoded packet is
/// re-measured; if its encoded length `L` fits in the buffer, exactly `L`
/// bytes are split off, decoded again and returned. A failed decode, or an
/// `L` longer than what is buffered, leaves `src` untouched.
///
/// A slice that measured fine but fails the second decode is logged and
/// dropped; the scan then continues with the bytes after it.
///
/// Bundles carry no overall length, so an unframed bundle is complete only
/// once the buffer ends on an element boundary. Senders that interleave
/// bundles with other traffic should use [`StreamFraming::Slip`].
pub fn decode_stream_packet(src: &mut BytesMut, max_buffer: usize) -> Result<Option<OscPacket>> {
    loop {
        if src.is_empty() {
            return Ok(None);
        }

        let len = match decode_packet(src) {
            // A bundle header with nothing after it is indistinguishable
            // from one whose first element has not arrived yet.
            Ok(OscPacket::Bundle(bundle)) if bundle.elements.is_empty() => {
                trace!(buffered = src.len(), "bundle header without elements");
                return check_overflow(src, max_buffer).map(|()| None);
            }
            Ok(packet) => packet.encoded_len(),
            Err(err) => {
                trace!(buffered = src.len(), %err, "waiting for more data");
                return check_overflow(src, max_buffer).map(|()| None);
            }
        };

        if len > src.len() {
            trace!(needed = len, buffered = src.len(), "partial packet buffered");
            return check_overflow(src, max_buffer).map(|()| None);
        }

        let frame = src.split_to(len);
        match decode_packet(&frame) {
            Ok(packet) => return Ok(Some(packet)),
            Err(err) => {
                warn!(len, %err, "dropping undecodable packet slice");
            }
        }
    }
}

fn decode_slip_packet(src: &mut BytesMut, max_buffer: usize) -> Result<Option<OscPacket>> {
    loop {
        let Some(frame) = slip::take_frame(src) else {
            return check_overflow(src, max_buffer).map(|()| None);
        };
        if frame.is_empty() {
            continue;
        }
        match decode_packet(&frame) {
            Ok(packet) => return Ok(Some(packet)),
            Err(err) => {
                warn!(len = frame.len(), %err, "dropping undecodable SLIP frame");
            }
        }
    }
}

fn check_overflow(src: &mut BytesMut, max_buffer: usize) -> Result<()> {
    if src.len() > max_buffer {
        let size = src.len();
        src.clear();
        return Err(FrameError::BufferOverflow {
            size,
            max: max_buffer,
        });
    }
    Ok(())
}

/// Incremental packet reassembly for one stream connection.
///
/// Owns the connection's buffer; bytes are processed strictly in arrival
/// order and an incomplete tail is always kept for the next push.
#[derive(Debug)]
pub struct StreamFramer {
    buf: BytesMut,
    config: FramerConfig,
}

impl StreamFramer {
    /// Create a framer with default configuration.
    pub fn new() -> Self {
        Self::with_config(FramerConfig::default())
    }

    /// Create a framer with explicit configuration.
    pub fn with_config(config: FramerConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Append received bytes and return every packet completed by them.
    pub fn push(&mut self, data: &[u8]) -> Vec<OscPacket> {
        self.buf.extend_from_slice(data);
        trace!(received = data.len(), buffered = self.buf.len(), "stream bytes");

        let mut packets = Vec::new();
        loop {
            match next_packet(&mut self.buf, &self.config) {
                Ok(Some(packet)) => packets.push(packet),
                Ok(None) => break,
                Err(err) => {
                    warn!(%err, "reassembly buffer discarded");
                    break;
                }
            }
        }

        if !packets.is_empty() {
            debug!(
                packets = packets.len(),
                remaining = self.buf.len(),
                "reassembled stream packets"
            );
        }
        packets
    }

    /// Bytes currently held waiting for a complete packet.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Drop any buffered partial packet.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Current framer configuration.
    pub fn config(&self) -> &FramerConfig {
        &self.config
    }
}

impl Default for StreamFramer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use bytes::{BufMut, Bytes};

    use super::*;
    use crate::codec::{encode_packet, encode_packet_into, OscArg, OscBundle, OscMessage, TimeTag};

    fn packets() -> Vec<OscPacket> {
        vec![
            OscMessage::with_args("/one", vec![OscArg::Int(1)]).into(),
            OscMessage::with_args(
                "/two/longer/address",
                vec![
                    OscArg::String("hello world".into()),
                    OscArg::Float(2.5),
                    OscArg::True,
                ],
            )
            .into(),
            OscMessage::new("/three").into(),
            OscMessage::with_args(
                "/four",
                vec![
                    OscArg::Blob(Bytes::from_static(&[9, 8, 7])),
                    OscArg::Midi([0, 0x90, 69, 100]),
                ],
            )
            .into(),
        ]
    }

    fn concat(packets: &[OscPacket]) -> BytesMut {
        let mut wire = BytesMut::new();
        for packet in packets {
            encode_packet_into(packet, &mut wire);
        }
        wire
    }

    #[test]
    fn byte_at_a_time_yields_every_packet_in_order() {
        let expected = packets();
        let wire = concat(&expected);

        let mut framer = StreamFramer::new();
        let mut received = Vec::new();
        for byte in wire.iter() {
            received.extend(framer.push(&[*byte]));
        }

        assert_eq!(received, expected);
        assert_eq!(framer.buffered_len(), 0);
    }

    #[test]
    fn arbitrary_split_points_yield_every_packet() {
        let expected = packets();
        let wire = concat(&expected);

        for chunk in [2, 3, 5, 7, 13, 64] {
            let mut framer = StreamFramer::new();
            let mut received = Vec::new();
            for part in wire.chunks(chunk) {
                received.extend(framer.push(part));
            }
            assert_eq!(received, expected, "chunk size {chunk}");
        }
    }

    #[test]
    fn two_packets_in_one_push() {
        let expected = packets();
        let wire = concat(&expected[..2]);

        let mut framer = StreamFramer::new();
        assert_eq!(framer.push(&wire), expected[..2].to_vec());
    }

    #[test]
    fn incomplete_tail_is_retained() {
        let wire = encode_packet(&packets()[1]);
        let mut framer = StreamFramer::new();

        assert!(framer.push(&wire[..wire.len() - 1]).is_empty());
        assert_eq!(framer.buffered_len(), wire.len() - 1);

        let out = framer.push(&wire[wire.len() - 1..]);
        assert_eq!(out.len(), 1);
        assert_eq!(framer.buffered_len(), 0);
    }

    #[test]
    fn single_bundle_is_reassembled() {
        let bundle: OscPacket = OscBundle::new(
            TimeTag::IMMEDIATE,
            vec![OscMessage::with_args("/a", vec![OscArg::Int(10)]).into()],
        )
        .into();
        let wire = encode_packet(&bundle);

        let mut framer = StreamFramer::new();
        let mut received = Vec::new();
        for byte in wire.iter() {
            received.extend(framer.push(&[*byte]));
        }
        assert_eq!(received, vec![bundle]);
    }

    #[test]
    fn garbage_prefix_waits_until_overflow() {
        let mut framer = StreamFramer::with_config(FramerConfig {
            max_buffer_size: 16,
            ..FramerConfig::default()
        });

        assert!(framer.push(b"garbage!").is_empty());
        assert_eq!(framer.buffered_len(), 8);

        assert!(framer.push(b"more garbage!!").is_empty());
        assert_eq!(framer.buffered_len(), 0);

        let wire = encode_packet(&packets()[0]);
        assert_eq!(framer.push(&wire).len(), 1);
    }

    #[test]
    fn overflow_is_reported_by_step_function() {
        let mut buf = BytesMut::new();
        buf.put_slice(&[0xFF; 32]);
        let result = decode_stream_packet(&mut buf, 8);
        assert!(matches!(result, Err(FrameError::BufferOverflow { size: 32, max: 8 })));
        assert!(buf.is_empty());
    }

    // Bundles carry no total length. Without delimiters a multi-element
    // bundle completes at its first element boundary.
    #[test]
    fn unframed_multi_element_bundle_is_cut_at_first_boundary() {
        let a: OscPacket = OscMessage::with_args("/a", vec![OscArg::Int(1)]).into();
        let b: OscPacket = OscMessage::with_args("/b", vec![OscArg::Int(2)]).into();
        let c: OscPacket = OscMessage::with_args("/c", vec![OscArg::Int(3)]).into();
        let bundle: OscPacket = OscBundle::new(TimeTag::IMMEDIATE, vec![a.clone(), b]).into();

        let mut wire = BytesMut::new();
        encode_packet_into(&bundle, &mut wire);
        encode_packet_into(&c, &mut wire);
        assert_eq!(wire.len(), 60);

        let mut framer = StreamFramer::new();
        let mut received = Vec::new();
        for byte in wire.iter() {
            received.extend(framer.push(&[*byte]));
        }
        let early: OscPacket = OscBundle::new(TimeTag::IMMEDIATE, vec![a]).into();
        assert_eq!(received, vec![early]);
        // The size prefix of `/b` heads the buffer and never decodes.
        assert_eq!(framer.buffered_len(), 28);

        let mut framer = StreamFramer::new();
        assert!(framer.push(&wire).is_empty());
        assert_eq!(framer.buffered_len(), 60);
    }

    #[test]
    fn slip_framing_reassembles_bundles_back_to_back() {
        let bundle: OscPacket = OscBundle::new(
            TimeTag(42),
            vec![
                OscMessage::with_args("/a", vec![OscArg::Int(1)]).into(),
                OscMessage::with_args("/b", vec![OscArg::Int(2)]).into(),
            ],
        )
        .into();
        let message: OscPacket = OscMessage::with_args("/c", vec![OscArg::Int(3)]).into();

        let mut wire = BytesMut::new();
        slip::slip_encode(&encode_packet(&bundle), &mut wire);
        slip::slip_encode(&encode_packet(&message), &mut wire);

        let mut framer = StreamFramer::with_config(FramerConfig {
            framing: StreamFraming::Slip,
            ..FramerConfig::default()
        });
        let mut received = Vec::new();
        for part in wire.chunks(3) {
            received.extend(framer.push(part));
        }
        assert_eq!(received, vec![bundle, message]);
    }

    #[test]
    fn slip_frame_with_bad_payload_is_dropped() {
        let mut wire = BytesMut::new();
        slip::slip_encode(b"not osc", &mut wire);
        slip::slip_encode(&encode_packet(&packets()[0]), &mut wire);

        let mut framer = StreamFramer::with_config(FramerConfig {
            framing: StreamFraming::Slip,
            ..FramerConfig::default()
        });
        assert_eq!(framer.push(&wire), vec![packets()[0].clone()]);
    }
}
