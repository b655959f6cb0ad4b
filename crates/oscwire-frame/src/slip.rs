//! SLIP framing (RFC 1055) for OSC 1.1 over byte streams.
//!
//! Optional alternative to self-delimiting reassembly: each packet is
//! wrapped in `END` delimiters with `END`/`ESC` bytes escaped.

use bytes::{Buf, BufMut, BytesMut};

pub const END: u8 = 0xC0;
pub const ESC: u8 = 0xDB;
pub const ESC_END: u8 = 0xDC;
pub const ESC_ESC: u8 = 0xDD;

/// Append `payload` to `dst` as one SLIP frame.
///
/// A leading `END` is written as well so a receiver flushes any line noise
/// before the frame.
pub fn slip_encode(payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(payload.len() + 2);
    dst.put_u8(END);
    for &b in payload {
        match b {
            END => dst.put_slice(&[ESC, ESC_END]),
            ESC => dst.put_slice(&[ESC, ESC_ESC]),
            _ => dst.put_u8(b),
        }
    }
    dst.put_u8(END);
}

/// Take the next delimited frame off the front of `src`, unescaped.
///
/// Returns `None` until an `END` byte has arrived. Empty frames (back to
/// back delimiters) come back as empty buffers. Invalid escapes are dropped.
pub fn take_frame(src: &mut BytesMut) -> Option<BytesMut> {
    let end = src.iter().position(|b| *b == END)?;
    let raw = src.split_to(end);
    src.advance(1);

    let mut frame = BytesMut::with_capacity(raw.len());
    let mut escaped = false;
    for &b in raw.iter() {
        if escaped {
            match b {
                ESC_END => frame.put_u8(END),
                ESC_ESC => frame.put_u8(ESC),
                _ => {}
            }
            escaped = false;
        } else if b == ESC {
            escaped = true;
        } else {
            frame.put_u8(b);
        }
    }
    Some(frame)
}
