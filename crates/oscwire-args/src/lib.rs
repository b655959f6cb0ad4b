//! Turning operator input into OSC arguments.
//!
//! - [`tokenize`] parses a space separated argument string with quoting
//! - [`hex`] validates hex bytes and bounded integers
//! - [`midi`] packs and unpacks the four-byte `m` argument
//! - [`SendAction`] builds a complete message for each kind of send

pub mod action;
pub mod error;
pub mod hex;
pub mod midi;
pub mod tokenizer;

pub use action::SendAction;
pub use error::{ArgsError, Result};
pub use hex::{checked_int, parse_checked_int, parse_hex_blob, parse_hex_byte, parse_hex_bytes};
pub use midi::{
    decode_midi, encode_midi, encode_midi_fields, encode_midi_raw, midi_type_from_status,
    MidiEvent, MidiFields, MidiMode, MidiType,
};
pub use tokenizer::{tokenize, tokenize_values, TokenizeStrategy};
