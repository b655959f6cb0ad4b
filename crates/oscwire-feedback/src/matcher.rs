use std::sync::Arc;

use oscwire_args::{decode_midi, tokenize, MidiEvent, MidiType, TokenizeStrategy};
use oscwire_frame::OscArg;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::compare::{evaluate_comparison, Comparison, Value};
use crate::store::ReceivedStateStore;

/// Fields a received MIDI argument must match. `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiFilter {
    pub kind: Option<MidiType>,
    pub channel: Option<u8>,
    pub data1: Option<u8>,
    pub data2: Option<u8>,
}

impl MidiFilter {
    pub fn matches(&self, event: &MidiEvent) -> bool {
        self.kind.is_none_or(|kind| kind == event.kind)
            && self.channel.is_none_or(|channel| channel == event.channel)
            && self.data1.is_none_or(|data1| data1 == event.data1)
            && self.data2.is_none_or(|data2| data2 == event.data2)
    }
}

/// Evaluates feedback predicates against a [`ReceivedStateStore`].
///
/// Every predicate answers `false` when nothing has been received for the
/// address yet.
#[derive(Debug, Clone)]
pub struct FeedbackMatcher {
    store: Arc<ReceivedStateStore>,
}

impl FeedbackMatcher {
    pub fn new(store: Arc<ReceivedStateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ReceivedStateStore> {
        &self.store
    }

    /// Compare every expected argument with the received one at the same
    /// position.
    ///
    /// `Equal` fails on the first position that differs. `NotEqual` fails on
    /// the first position that is equal, so it holds only when every pair
    /// differs. Other operators are not supported here and never match.
    pub fn match_arguments(&self, address: &str, expected: &str, mode: &Comparison) -> bool {
        let expected = match tokenize(expected, TokenizeStrategy::Sanitised) {
            Ok(args) => args,
            Err(err) => {
                warn!(address, %err, "feedback arguments rejected");
                return false;
            }
        };

        let Some(received) = self.store.get(address) else {
            debug!(address, "no message received for address yet");
            return false;
        };

        match mode {
            Comparison::Equal => {
                for (index, arg) in expected.iter().enumerate() {
                    if !args_equal(arg, received.get(index)) {
                        debug!(address, index, expected = ?arg, received = ?received.get(index), "argument mismatch");
                        return false;
                    }
                }
                true
            }
            Comparison::NotEqual => {
                for (index, arg) in expected.iter().enumerate() {
                    if args_equal(arg, received.get(index)) {
                        debug!(address, index, "argument unexpectedly equal");
                        return false;
                    }
                }
                true
            }
            other => {
                warn!(address, comparison = %other, "multi-argument feedback supports equal and notequal only");
                false
            }
        }
    }

    /// Compare the received argument at `index` with `target`.
    ///
    /// `target` is classified on every call: a finite number compares
    /// numerically, `true`/`false` compares as text for equal and notequal,
    /// anything else compares as a string.
    pub fn match_indexed(
        &self,
        address: &str,
        index: usize,
        comparison: &Comparison,
        target: &str,
    ) -> bool {
        let Some(arg) = self.store.get(address).and_then(|args| args.get(index).cloned()) else {
            debug!(address, index, "no received argument at index");
            return false;
        };
        let Some(received) = Value::from_arg(&arg) else {
            return false;
        };

        let target = target.trim();
        let result = match classify_target(target) {
            Target::Number(number) => {
                // Floats arrive as f32; compare at that precision.
                let number = match arg {
                    OscArg::Float(_) => f64::from(number as f32),
                    _ => number,
                };
                evaluate_comparison(&received, &Value::Number(number), comparison)
            }
            Target::Bool => match comparison {
                Comparison::Equal | Comparison::NotEqual => evaluate_comparison(
                    &Value::Text(received.to_text()),
                    &Value::from(target),
                    comparison,
                ),
                other => {
                    warn!(address, comparison = %other, "boolean target supports equal and notequal only");
                    false
                }
            },
            Target::Text => evaluate_comparison(&received, &Value::from(target), comparison),
        };

        debug!(address, index, %comparison, target, result, "indexed feedback evaluated");
        result
    }

    /// True once per arrival: a match consumes the stored entry.
    pub fn check_presence(&self, address: &str) -> bool {
        self.store.take_if_present(address)
    }

    /// Decode the MIDI argument at `index` and test it against `filter`.
    pub fn match_midi(&self, address: &str, index: usize, filter: &MidiFilter) -> bool {
        match self.store.get(address).as_deref().and_then(|args| args.get(index)) {
            Some(OscArg::Midi(bytes)) => filter.matches(&decode_midi(*bytes)),
            Some(other) => {
                debug!(address, index, tag = %other.type_tag(), "argument is not MIDI");
                false
            }
            None => false,
        }
    }
}

enum Target {
    Number(f64),
    Bool,
    Text,
}

fn classify_target(target: &str) -> Target {
    if let Some(number) = target.parse::<f64>().ok().filter(|n| n.is_finite()) {
        return Target::Number(number);
    }
    match target {
        "true" | "false" => Target::Bool,
        _ => Target::Text,
    }
}

fn args_equal(expected: &OscArg, received: Option<&OscArg>) -> bool {
    let Some(received) = received else {
        return false;
    };
    match (Value::from_arg(expected), Value::from_arg(received)) {
        (Some(expected), Some(received)) => expected == received,
        (None, None) => expected.type_tag() == received.type_tag(),
        _ => false,
    }
}
