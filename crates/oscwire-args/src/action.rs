use bytes::Bytes;
use oscwire_frame::{OscArg, OscMessage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{ArgsError, Result};
use crate::hex::{parse_checked_int, parse_hex_blob};
use crate::midi::{encode_midi_fields, encode_midi_raw, MidiFields, MidiMode};
use crate::tokenizer::{tokenize, tokenize_values, TokenizeStrategy};

/// One operator "send" action, with its options already substituted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SendAction {
    /// Address only.
    Blank,
    Int { value: String },
    Float { value: String },
    String { value: String },
    Boolean { value: bool },
    /// Space separated arguments, see [`tokenize`].
    Multiple {
        arguments: String,
        #[serde(default)]
        strategy: TokenizeStrategy,
    },
    /// A list produced by a variable that already holds structured data.
    Values { values: Vec<Value> },
    /// Hex bytes for a `b` argument.
    Blob { hex: String },
    Midi {
        mode: MidiMode,
        #[serde(flatten)]
        fields: MidiFields,
    },
    /// Four hex bytes for an `m` argument.
    MidiRaw { hex: String },
}

impl SendAction {
    /// Build the message for `address`, or fail before anything is sent.
    pub fn build(&self, address: &str) -> Result<OscMessage> {
        let args = self.arguments().inspect_err(|err| {
            warn!(address, %err, "send action rejected");
        })?;
        Ok(OscMessage::with_args(address, args))
    }

    fn arguments(&self) -> Result<Vec<OscArg>> {
        let args = match self {
            SendAction::Blank => Vec::new(),
            SendAction::Int { value } => {
                let int = parse_checked_int(value, i32::MIN.into(), i32::MAX.into(), "int")?;
                vec![OscArg::Int(int as i32)]
            }
            SendAction::Float { value } => vec![OscArg::Float(parse_float(value)?)],
            SendAction::String { value } => vec![OscArg::String(value.clone())],
            SendAction::Boolean { value } => vec![OscArg::bool(*value)],
            SendAction::Multiple {
                arguments,
                strategy,
            } => tokenize(arguments, *strategy)?,
            SendAction::Values { values } => tokenize_values(values),
            SendAction::Blob { hex } => vec![OscArg::Blob(Bytes::from(parse_hex_blob(hex)?))],
            SendAction::Midi { mode, fields } => vec![OscArg::Midi(encode_midi_fields(*mode, fields)?)],
            SendAction::MidiRaw { hex } => vec![OscArg::Midi(encode_midi_raw(hex)?)],
        };
        Ok(args)
    }
}

fn parse_float(input: &str) -> Result<f32> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v as f32)
        .ok_or_else(|| ArgsError::NotANumber {
            name: "float",
            input: input.into(),
        })
}
