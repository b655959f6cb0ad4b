use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Bundle marker including its null terminator.
pub const BUNDLE_TAG: &[u8; 8] = b"#bundle\0";

/// OSC time tag: NTP seconds in the upper 32 bits, fraction in the lower 32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimeTag(pub u64);

impl TimeTag {
    /// The special "execute immediately" time tag.
    pub const IMMEDIATE: TimeTag = TimeTag(1);

    pub fn seconds(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn fraction(self) -> u32 {
        self.0 as u32
    }
}

/// A single typed OSC argument.
///
/// The type tag is carried by the variant, so a value can never disagree
/// with its tag. `Midi` is fixed at four bytes: port id, status, data1, data2.
#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    Int(i32),
    Float(f32),
    String(String),
    True,
    False,
    Blob(Bytes),
    Midi([u8; 4]),
    Long(i64),
    Double(f64),
    TimeTag(TimeTag),
    Char(char),
    Color([u8; 4]),
    Symbol(String),
    Nil,
    Impulse,
}

impl OscArg {
    /// Boolean argument (`T` or `F`).
    pub fn bool(value: bool) -> Self {
        if value {
            OscArg::True
        } else {
            OscArg::False
        }
    }

    /// The type tag character written into the type-tag string.
    pub fn type_tag(&self) -> char {
        match self {
            OscArg::Int(_) => 'i',
            OscArg::Float(_) => 'f',
            OscArg::String(_) => 's',
            OscArg::True => 'T',
            OscArg::False => 'F',
            OscArg::Blob(_) => 'b',
            OscArg::Midi(_) => 'm',
            OscArg::Long(_) => 'h',
            OscArg::Double(_) => 'd',
            OscArg::TimeTag(_) => 't',
            OscArg::Char(_) => 'c',
            OscArg::Color(_) => 'r',
            OscArg::Symbol(_) => 'S',
            OscArg::Nil => 'N',
            OscArg::Impulse => 'I',
        }
    }

    /// Number of payload bytes this argument occupies after the type tags.
    pub fn payload_len(&self) -> usize {
        match self {
            OscArg::Int(_) | OscArg::Float(_) | OscArg::Char(_) => 4,
            OscArg::Midi(_) | OscArg::Color(_) => 4,
            OscArg::Long(_) | OscArg::Double(_) | OscArg::TimeTag(_) => 8,
            OscArg::String(s) | OscArg::Symbol(s) => padded_string_len(s.len()),
            OscArg::Blob(b) => 4 + pad4(b.len()),
            OscArg::True | OscArg::False | OscArg::Nil | OscArg::Impulse => 0,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OscArg::True => Some(true),
            OscArg::False => Some(false),
            _ => None,
        }
    }
}

/// An OSC message: an address pattern plus ordered arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    pub address: String,
    pub args: Vec<OscArg>,
}

impl OscMessage {
    /// Create a message with no arguments.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            args: Vec::new(),
        }
    }

    /// Create a message with the given arguments.
    pub fn with_args(address: impl Into<String>, args: Vec<OscArg>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }

    /// The type-tag string, including the leading comma.
    pub fn type_tags(&self) -> String {
        let mut tags = String::with_capacity(self.args.len() + 1);
        tags.push(',');
        tags.extend(self.args.iter().map(OscArg::type_tag));
        tags
    }

    /// Exact encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        padded_string_len(self.address.len())
            + padded_string_len(self.args.len() + 1)
            + self.args.iter().map(OscArg::payload_len).sum::<usize>()
    }
}

/// An OSC bundle: a time tag and ordered elements.
#[derive(Debug, Clone, PartialEq)]
pub struct OscBundle {
    pub time_tag: TimeTag,
    pub elements: Vec<OscPacket>,
}

impl OscBundle {
    pub fn new(time_tag: TimeTag, elements: Vec<OscPacket>) -> Self {
        Self { time_tag, elements }
    }

    /// Exact encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        BUNDLE_TAG.len()
            + 8
            + self
                .elements
                .iter()
                .map(|element| 4 + element.encoded_len())
                .sum::<usize>()
    }
}

/// Either a message or a bundle.
#[derive(Debug, Clone, PartialEq)]
pub enum OscPacket {
    Message(OscMessage),
    Bundle(OscBundle),
}

impl OscPacket {
    /// Exact encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            OscPacket::Message(msg) => msg.encoded_len(),
            OscPacket::Bundle(bundle) => bundle.encoded_len(),
        }
    }

    /// Messages delivered for this packet, in original order.
    ///
    /// A message yields itself. A bundle yields its direct message elements;
    /// nested bundles are one level too deep and are not flattened.
    pub fn messages(&self) -> Vec<&OscMessage> {
        match self {
            OscPacket::Message(msg) => vec![msg],
            OscPacket::Bundle(bundle) => bundle
                .elements
                .iter()
                .filter_map(|element| match element {
                    OscPacket::Message(msg) => Some(msg),
                    OscPacket::Bundle(_) => None,
                })
                .collect(),
        }
    }
}

impl From<OscMessage> for OscPacket {
    fn from(msg: OscMessage) -> Self {
        OscPacket::Message(msg)
    }
}

impl From<OscBundle> for OscPacket {
    fn from(bundle: OscBundle) -> Self {
        OscPacket::Bundle(bundle)
    }
}

fn pad4(len: usize) -> usize {
    (len + 3) & !3
}

/// Size of an OSC string of `len` bytes once null-terminated and padded.
fn padded_string_len(len: usize) -> usize {
    pad4(len + 1)
}

/// Encode a packet into a fresh buffer.
pub fn encode_packet(packet: &OscPacket) -> Bytes {
    let mut dst = BytesMut::with_capacity(packet.encoded_len());
    encode_packet_into(packet, &mut dst);
    dst.freeze()
}

/// Encode a message into a fresh buffer.
pub fn encode_message(msg: &OscMessage) -> Bytes {
    let mut dst = BytesMut::with_capacity(msg.encoded_len());
    encode_message_into(msg, &mut dst);
    dst.freeze()
}

/// Append the wire form of `packet` to `dst`.
///
/// Wire format of a message:
/// ```text
/// ┌──────────────────┬──────────────────┬─────────────────────────┐
/// │ Address          │ Type tags        │ Arguments               │
/// │ "/a/b\0" pad→4   │ ",ifs\0" pad→4   │ i/f: 4B BE, s: pad→4,   │
/// │                  │                  │ b: len + pad→4, m: 4B   │
/// └──────────────────┴──────────────────┴─────────────────────────┘
/// ```
/// A bundle is `#bundle\0`, an 8-byte time tag, then each element
/// prefixed by its int32 size.
pub fn encode_packet_into(packet: &OscPacket, dst: &mut BytesMut) {
    match packet {
        OscPacket::Message(msg) => encode_message_into(msg, dst),
        OscPacket::Bundle(bundle) => {
            dst.reserve(bundle.encoded_len());
            dst.put_slice(BUNDLE_TAG);
            dst.put_u64(bundle.time_tag.0);
            for element in &bundle.elements {
                dst.put_i32(element.encoded_len() as i32);
                encode_packet_into(element, dst);
            }
        }
    }
}

fn encode_message_into(msg: &OscMessage, dst: &mut BytesMut) {
    dst.reserve(msg.encoded_len());
    put_string(dst, &msg.address);
    put_string(dst, &msg.type_tags());
    for arg in &msg.args {
        match arg {
            OscArg::Int(v) => dst.put_i32(*v),
            OscArg::Float(v) => dst.put_f32(*v),
            OscArg::String(s) | OscArg::Symbol(s) => put_string(dst, s),
            OscArg::Blob(b) => {
                dst.put_i32(b.len() as i32);
                dst.put_slice(b);
                put_padding(dst, b.len());
            }
            OscArg::Midi(bytes) | OscArg::Color(bytes) => dst.put_slice(bytes),
            OscArg::Long(v) => dst.put_i64(*v),
            OscArg::Double(v) => dst.put_f64(*v),
            OscArg::TimeTag(tag) => dst.put_u64(tag.0),
            OscArg::Char(c) => dst.put_u32(*c as u32),
            OscArg::True | OscArg::False | OscArg::Nil | OscArg::Impulse => {}
        }
    }
}

fn put_string(dst: &mut BytesMut, s: &str) {
    dst.put_slice(s.as_bytes());
    let padded = padded_string_len(s.len());
    dst.put_bytes(0, padded - s.len());
}

fn put_padding(dst: &mut BytesMut, written: usize) {
    dst.put_bytes(0, pad4(written) - written);
}

/// Decode one packet from the start of `buf`.
///
/// Messages are read as a prefix: bytes after the last argument are
/// ignored. Bundles read size-prefixed elements until `buf` is exhausted.
pub fn decode_packet(buf: &[u8]) -> Result<OscPacket> {
    match buf.first() {
        None => Err(FrameError::truncated("header", 0)),
        Some(b'/') => decode_message(buf).map(OscPacket::Message),
        Some(b'#') => decode_bundle(buf).map(OscPacket::Bundle),
        Some(_) => Err(FrameError::InvalidHeader),
    }
}

/// Decode a single message from the start of `buf`.
pub fn decode_message(buf: &[u8]) -> Result<OscMessage> {
    let mut cursor = Cursor::new(buf);
    let address = cursor.read_string("address")?;
    if !address.starts_with('/') {
        return Err(FrameError::InvalidHeader);
    }

    let tags = cursor.read_string("type tags")?;
    let Some(tags) = tags.strip_prefix(',') else {
        return Err(FrameError::TypeTagMismatch(format!(
            "type-tag string {tags:?} does not start with ','"
        )));
    };

    let mut args = Vec::with_capacity(tags.len());
    for tag in tags.chars() {
        args.push(cursor.read_arg(tag)?);
    }

    Ok(OscMessage { address, args })
}

fn decode_bundle(buf: &[u8]) -> Result<OscBundle> {
    if buf.len() < BUNDLE_TAG.len() {
        return if BUNDLE_TAG.starts_with(buf) {
            Err(FrameError::truncated("bundle tag", buf.len()))
        } else {
            Err(FrameError::InvalidHeader)
        };
    }
    if &buf[..BUNDLE_TAG.len()] != BUNDLE_TAG {
        return Err(FrameError::InvalidHeader);
    }

    let mut cursor = Cursor::new(buf);
    cursor.pos = BUNDLE_TAG.len();
    let time_tag = TimeTag(cursor.read_u64("time tag")?);

    let mut elements = Vec::new();
    while !cursor.is_empty() {
        let size = cursor.read_i32("element size")?;
        if size < 0 {
            return Err(FrameError::TypeTagMismatch(format!(
                "negative bundle element size {size}"
            )));
        }
        let element = cursor.read_slice(size as usize, "bundle element")?;
        elements.push(decode_packet(element)?);
    }

    Ok(OscBundle { time_tag, elements })
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn read_slice(&mut self, len: usize, context: &'static str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| FrameError::truncated(context, self.pos))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        let slice = self.read_slice(N, context)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn read_i32(&mut self, context: &'static str) -> Result<i32> {
        self.read_array::<4>(context).map(i32::from_be_bytes)
    }

    fn read_u64(&mut self, context: &'static str) -> Result<u64> {
        self.read_array::<8>(context).map(u64::from_be_bytes)
    }

    fn read_string(&mut self, context: &'static str) -> Result<String> {
        let start = self.pos;
        let rest = self.buf.get(start..).unwrap_or_default();
        let nul = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| FrameError::truncated(context, start))?;
        let text = std::str::from_utf8(&rest[..nul])
            .map_err(|_| FrameError::InvalidString { offset: start })?
            .to_string();
        self.read_slice(padded_string_len(nul), context)?;
        Ok(text)
    }

    fn read_arg(&mut self, tag: char) -> Result<OscArg> {
        let arg = match tag {
            'i' => OscArg::Int(self.read_i32("int32 argument")?),
            'f' => OscArg::Float(f32::from_be_bytes(self.read_array("float32 argument")?)),
            's' => OscArg::String(self.read_string("string argument")?),
            'S' => OscArg::Symbol(self.read_string("symbol argument")?),
            'b' => {
                let len = self.read_i32("blob size")?;
                if len < 0 {
                    return Err(FrameError::TypeTagMismatch(format!(
                        "negative blob size {len}"
                    )));
                }
                let len = len as usize;
                let data = self.read_slice(len, "blob data")?;
                self.read_slice(pad4(len) - len, "blob padding")?;
                OscArg::Blob(Bytes::copy_from_slice(data))
            }
            'm' => OscArg::Midi(self.read_array("midi argument")?),
            'r' => OscArg::Color(self.read_array("rgba argument")?),
            'h' => OscArg::Long(i64::from_be_bytes(self.read_array("int64 argument")?)),
            'd' => OscArg::Double(f64::from_be_bytes(self.read_array("float64 argument")?)),
            't' => OscArg::TimeTag(TimeTag(self.read_u64("time tag argument")?)),
            'c' => {
                let offset = self.pos;
                let raw = u32::from_be_bytes(self.read_array("char argument")?);
                OscArg::Char(char::from_u32(raw).ok_or(FrameError::InvalidString { offset })?)
            }
            'T' => OscArg::True,
            'F' => OscArg::False,
            'N' => OscArg::Nil,
            'I' => OscArg::Impulse,
            other => return Err(FrameError::UnknownTypeTag(other)),
        };
        Ok(arg)
    }
}
