/// Errors that can occur during OSC packet encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The packet starts with neither an address (`/`) nor `#bundle`.
    #[error("invalid packet header (expected '/' address or \"#bundle\")")]
    InvalidHeader,

    /// The buffer ended before the packet was complete.
    #[error("packet truncated while reading {context} at offset {offset}")]
    Truncated { context: &'static str, offset: usize },

    /// The type-tag string does not describe the arguments that follow.
    #[error("type tag mismatch: {0}")]
    TypeTagMismatch(String),

    /// A type tag this codec does not understand.
    #[error("unknown type tag '{0}'")]
    UnknownTypeTag(char),

    /// An OSC string was not valid UTF-8.
    #[error("invalid string at offset {offset}")]
    InvalidString { offset: usize },

    /// The reassembly buffer grew past its configured ceiling.
    #[error("reassembly buffer overflow ({size} bytes, max {max})")]
    BufferOverflow { size: usize, max: usize },

    /// An I/O error occurred on the underlying stream.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    pub(crate) fn truncated(context: &'static str, offset: usize) -> Self {
        Self::Truncated { context, offset }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
