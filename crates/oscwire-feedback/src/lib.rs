//! Feedback for inbound OSC.
//!
//! [`InboundDispatcher`] plugs into a transport as its handler and records
//! the latest arguments per address in a [`ReceivedStateStore`].
//! [`FeedbackMatcher`] answers operator predicates against that store.

pub mod compare;
pub mod inbound;
pub mod matcher;
pub mod store;

pub use compare::{evaluate_comparison, Comparison, Value};
pub use inbound::{arg_json, arg_text, Host, InboundDispatcher, Variables};
pub use matcher::{FeedbackMatcher, MidiFilter};
pub use store::ReceivedStateStore;
