//! Four-byte MIDI messages carried in the OSC `m` argument.
//!
//! Layout: `[port id, status, data1, data2]`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ArgsError, Result};
use crate::hex::{parse_checked_int, parse_hex_bytes};

/// How the operator describes a MIDI message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MidiMode {
    NoteOn,
    NoteOff,
    Cc,
    Program,
    PolyAftertouch,
    ChannelPressure,
    PitchBend,
    /// All four bytes given verbatim as hex.
    Raw,
}

impl MidiMode {
    pub fn as_str(self) -> &'static str {
        match self {
            MidiMode::NoteOn => "noteon",
            MidiMode::NoteOff => "noteoff",
            MidiMode::Cc => "cc",
            MidiMode::Program => "program",
            MidiMode::PolyAftertouch => "polyaftertouch",
            MidiMode::ChannelPressure => "channelpressure",
            MidiMode::PitchBend => "pitchbend",
            MidiMode::Raw => "raw",
        }
    }

    /// High nibble of the status byte. `None` for raw mode.
    pub fn status_base(self) -> Option<u8> {
        match self {
            MidiMode::NoteOff => Some(0x80),
            MidiMode::NoteOn => Some(0x90),
            MidiMode::PolyAftertouch => Some(0xA0),
            MidiMode::Cc => Some(0xB0),
            MidiMode::Program => Some(0xC0),
            MidiMode::ChannelPressure => Some(0xD0),
            MidiMode::PitchBend => Some(0xE0),
            MidiMode::Raw => None,
        }
    }
}

impl fmt::Display for MidiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MidiMode {
    type Err = ArgsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "noteon" => Ok(MidiMode::NoteOn),
            "noteoff" => Ok(MidiMode::NoteOff),
            "cc" => Ok(MidiMode::Cc),
            "program" => Ok(MidiMode::Program),
            "polyaftertouch" => Ok(MidiMode::PolyAftertouch),
            "channelpressure" => Ok(MidiMode::ChannelPressure),
            "pitchbend" => Ok(MidiMode::PitchBend),
            "raw" => Ok(MidiMode::Raw),
            other => Err(ArgsError::UnknownMidiMode(other.into())),
        }
    }
}

/// Message type recovered from a status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MidiType {
    NoteOff,
    NoteOn,
    PolyAftertouch,
    Cc,
    Program,
    ChannelPressure,
    PitchBend,
    Unknown,
}

impl MidiType {
    pub fn as_str(self) -> &'static str {
        match self {
            MidiType::NoteOff => "noteoff",
            MidiType::NoteOn => "noteon",
            MidiType::PolyAftertouch => "polyaftertouch",
            MidiType::Cc => "cc",
            MidiType::Program => "program",
            MidiType::ChannelPressure => "channelpressure",
            MidiType::PitchBend => "pitchbend",
            MidiType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MidiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a status byte by its high nibble. System messages are `Unknown`.
pub fn midi_type_from_status(status: u8) -> MidiType {
    match status & 0xF0 {
        0x80 => MidiType::NoteOff,
        0x90 => MidiType::NoteOn,
        0xA0 => MidiType::PolyAftertouch,
        0xB0 => MidiType::Cc,
        0xC0 => MidiType::Program,
        0xD0 => MidiType::ChannelPressure,
        0xE0 => MidiType::PitchBend,
        _ => MidiType::Unknown,
    }
}

/// A decoded `m` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiEvent {
    pub port: u8,
    pub kind: MidiType,
    /// 1-based channel.
    pub channel: u8,
    pub data1: u8,
    pub data2: u8,
}

impl MidiEvent {
    /// Signed pitch (−8192..=8191) when this is a pitch bend.
    pub fn pitch(&self) -> Option<i16> {
        if self.kind != MidiType::PitchBend {
            return None;
        }
        let value = (u16::from(self.data2 & 0x7F) << 7) | u16::from(self.data1 & 0x7F);
        Some(value as i16 - 8192)
    }
}

pub fn decode_midi(bytes: [u8; 4]) -> MidiEvent {
    let [port, status, data1, data2] = bytes;
    MidiEvent {
        port,
        kind: midi_type_from_status(status),
        channel: (status & 0x0F) + 1,
        data1,
        data2,
    }
}

/// Encode a channel message from already validated numbers.
///
/// `channel` is 1-based. For pitch bend `data1` is ignored and `pitch`
/// (−8192..=8191) supplies both data bytes; program and channel pressure
/// force `data2` to 0.
pub fn encode_midi(
    port: u8,
    mode: MidiMode,
    channel: u8,
    data1: u8,
    data2: u8,
    pitch: i16,
) -> [u8; 4] {
    let Some(base) = mode.status_base() else {
        return [port, 0, data1, data2];
    };
    let status = base | (channel.wrapping_sub(1) & 0x0F);
    match mode {
        MidiMode::PitchBend => {
            let value = (i32::from(pitch) + 8192) as u16;
            [port, status, (value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8]
        }
        MidiMode::Program | MidiMode::ChannelPressure => [port, status, data1 & 0x7F, 0],
        _ => [port, status, data1 & 0x7F, data2 & 0x7F],
    }
}

/// The four raw bytes of a `raw` mode message.
pub fn encode_midi_raw(hex: &str) -> Result<[u8; 4]> {
    let bytes = parse_hex_bytes(hex, 4)?;
    Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Operator text for one MIDI message, after variable substitution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiFields {
    pub port: String,
    pub channel: String,
    pub data1: String,
    /// Second data byte, or the signed pitch for pitch bend.
    pub data2: String,
}

/// Validate `fields` and encode them for `mode`.
///
/// Port 0–255, channel 1–16, data 0–127, pitch −8192..=8191. Raw mode takes
/// the four bytes from `fields.data1` as hex.
pub fn encode_midi_fields(mode: MidiMode, fields: &MidiFields) -> Result<[u8; 4]> {
    if mode == MidiMode::Raw {
        return encode_midi_raw(&fields.data1);
    }

    let port = parse_checked_int(&fields.port, 0, 255, "port")? as u8;
    let channel = parse_checked_int(&fields.channel, 1, 16, "channel")? as u8;

    match mode {
        MidiMode::PitchBend => {
            let pitch = parse_checked_int(&fields.data2, -8192, 8191, "pitch")? as i16;
            Ok(encode_midi(port, mode, channel, 0, 0, pitch))
        }
        MidiMode::Program | MidiMode::ChannelPressure => {
            let data1 = parse_checked_int(&fields.data1, 0, 127, "data1")? as u8;
            Ok(encode_midi(port, mode, channel, data1, 0, 0))
        }
        _ => {
            let data1 = parse_checked_int(&fields.data1, 0, 127, "data1")? as u8;
            let data2 = parse_checked_int(&fields.data2, 0, 127, "data2")? as u8;
            Ok(encode_midi(port, mode, channel, data1, data2, 0))
        }
    }
}
