//! Open Sound Control for driving and monitoring remote devices.
//!
//! oscwire sends OSC over UDP, TCP, raw TCP and serial links, reassembles
//! packets from unframed byte streams, and matches received values against
//! operator feedback predicates.
//!
//! # Crate Structure
//!
//! - [`frame`] - OSC codec and stream reassembly
//! - [`transport`] - UDP, TCP and serial clients behind one async contract
//! - [`args`] - Argument tokenizer, hex helpers, MIDI sub-codec, send actions
//! - [`feedback`] - Received-state store, comparisons and feedback matcher

/// Re-export frame types.
pub mod frame {
    pub use oscwire_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use oscwire_transport::*;
}

/// Re-export argument parsing types.
pub mod args {
    pub use oscwire_args::*;
}

/// Re-export feedback types.
pub mod feedback {
    pub use oscwire_feedback::*;
}
