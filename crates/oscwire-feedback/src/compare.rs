use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use oscwire_frame::OscArg;

/// Comparison operator chosen for a feedback.
///
/// Unrecognised names parse to `Unknown`, which never matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Comparison {
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanEqual,
    LessThanEqual,
    Unknown(String),
}

impl Comparison {
    pub fn as_str(&self) -> &str {
        match self {
            Comparison::Equal => "equal",
            Comparison::NotEqual => "notequal",
            Comparison::GreaterThan => "greaterthan",
            Comparison::LessThan => "lessthan",
            Comparison::GreaterThanEqual => "greaterthanequal",
            Comparison::LessThanEqual => "lessthanequal",
            Comparison::Unknown(name) => name,
        }
    }
}

impl FromStr for Comparison {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Infallible> {
        Ok(match s {
            "equal" => Comparison::Equal,
            "notequal" => Comparison::NotEqual,
            "greaterthan" => Comparison::GreaterThan,
            "lessthan" => Comparison::LessThan,
            "greaterthanequal" => Comparison::GreaterThanEqual,
            "lessthanequal" => Comparison::LessThanEqual,
            other => Comparison::Unknown(other.to_string()),
        })
    }
}

impl From<&str> for Comparison {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(comparison) => comparison,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A received or expected value, as compared by feedbacks.
///
/// Integer and floating point arguments are both `Number`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
    Bytes(Bytes),
}

impl Value {
    /// Comparable view of an argument. `Nil` and `Impulse` have none.
    pub fn from_arg(arg: &OscArg) -> Option<Self> {
        let value = match arg {
            OscArg::Int(v) => Value::Number(f64::from(*v)),
            OscArg::Float(v) => Value::Number(f64::from(*v)),
            OscArg::Long(v) => Value::Number(*v as f64),
            OscArg::Double(v) => Value::Number(*v),
            OscArg::TimeTag(t) => Value::Number(t.0 as f64),
            OscArg::String(s) | OscArg::Symbol(s) => Value::Text(s.clone()),
            OscArg::Char(c) => Value::Text(c.to_string()),
            OscArg::True => Value::Bool(true),
            OscArg::False => Value::Bool(false),
            OscArg::Blob(b) => Value::Bytes(b.clone()),
            OscArg::Midi(b) | OscArg::Color(b) => Value::Bytes(Bytes::copy_from_slice(b)),
            OscArg::Nil | OscArg::Impulse => return None,
        };
        Some(value)
    }

    /// Text form used when a target is compared as a string.
    pub fn to_text(&self) -> String {
        match self {
            Value::Number(n) => n.to_string(),
            Value::Text(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Bytes(b) => b
                .iter()
                .map(|byte| format!("{byte:02x}"))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Ordering between values of the same kind. Mixed kinds and bytes
    /// have no order.
    fn order(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Apply `comparison` to `received` and `target`.
///
/// Equality is type sensitive: a number never equals text. The ordering
/// operators compare numbers numerically and text lexically; any other
/// pairing is false.
///
/// ```
/// use oscwire_feedback::{evaluate_comparison, Comparison, Value};
///
/// assert!(evaluate_comparison(&Value::from(10.0), &Value::from(5.0), &Comparison::GreaterThan));
/// assert!(!evaluate_comparison(&Value::from(1.0), &Value::from(1.0), &"bogus".into()));
/// ```
pub fn evaluate_comparison(received: &Value, target: &Value, comparison: &Comparison) -> bool {
    match comparison {
        Comparison::Equal => received == target,
        Comparison::NotEqual => received != target,
        Comparison::GreaterThan => received.order(target) == Some(Ordering::Greater),
        Comparison::LessThan => received.order(target) == Some(Ordering::Less),
        Comparison::GreaterThanEqual => matches!(
            received.order(target),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Comparison::LessThanEqual => matches!(
            received.order(target),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Comparison::Unknown(_) => false,
    }
}
