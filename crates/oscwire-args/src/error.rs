/// Errors raised while turning operator input into OSC arguments.
///
/// Every variant aborts the action before anything is sent.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArgsError {
    /// A quoted run was never closed. Carries the partial token.
    #[error("Unmatched quote in arguments: {0}")]
    UnmatchedQuote(String),

    /// A token is not a one or two digit hex byte.
    #[error("invalid hex byte {0:?}")]
    InvalidHexByte(String),

    /// A hex byte list had the wrong number of bytes.
    #[error("expected {expected} hex bytes, got {actual}")]
    ByteCount { expected: usize, actual: usize },

    /// A numeric field was outside its inclusive range.
    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: i64,
        max: i64,
    },

    /// A numeric field did not parse or was not finite.
    #[error("{name} is not a number: {input:?}")]
    NotANumber { name: &'static str, input: String },

    /// The MIDI mode name is not recognised.
    #[error("unknown MIDI mode {0:?}")]
    UnknownMidiMode(String),
}

pub type Result<T> = std::result::Result<T, ArgsError>;
