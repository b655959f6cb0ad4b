use oscwire_frame::OscArg;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ArgsError, Result};

// Smart double quotes are folded into this before splitting.
const QUOTE: char = '"';

/// How string tokens and boolean literals are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizeStrategy {
    /// Strip `"` and `'` from strings; `true`/`false` become `T`/`F`.
    #[default]
    Sanitised,
    /// Keep quote characters; `true`/`false` stay strings.
    Verbatim,
}

/// Split operator text into typed OSC arguments.
///
/// Tokens are separated by ASCII spaces. Numbers become `i`, or `f` when
/// they contain a decimal point or do not fit in an `i32`. A token opening
/// with `"` absorbs following tokens until one ends with `"`. Apostrophes
/// never group tokens; Sanitised mode only strips them.
///
/// ```
/// use oscwire_args::{tokenize, TokenizeStrategy};
/// use oscwire_frame::OscArg;
///
/// let args = tokenize("\"hello world\" 123", TokenizeStrategy::Sanitised).unwrap();
/// assert_eq!(args, vec![OscArg::String("hello world".into()), OscArg::Int(123)]);
/// ```
pub fn tokenize(input: &str, strategy: TokenizeStrategy) -> Result<Vec<OscArg>> {
    let normalised = input.replace(['\u{201C}', '\u{201D}'], "\"");
    let mut tokens = normalised.split(' ').filter(|token| !token.is_empty());
    let mut args = Vec::new();

    while let Some(token) = tokens.next() {
        if let Some(arg) = parse_number(token) {
            args.push(arg);
            continue;
        }

        let arg = if token.starts_with(QUOTE) {
            let mut run = token.to_string();
            while !run.ends_with(QUOTE) {
                let Some(next) = tokens.next() else {
                    return Err(ArgsError::UnmatchedQuote(run));
                };
                run.push(' ');
                run.push_str(next);
            }
            OscArg::String(finish_string(&run, strategy))
        } else {
            match (strategy, token) {
                (TokenizeStrategy::Sanitised, "true") => OscArg::True,
                (TokenizeStrategy::Sanitised, "false") => OscArg::False,
                _ => OscArg::String(finish_string(token, strategy)),
            }
        };
        args.push(arg);
    }

    Ok(args)
}

/// Map an already structured list onto arguments by each element's kind.
///
/// Numbers become `f`, strings `s`, booleans `T`/`F`. Anything else is
/// dropped.
pub fn tokenize_values(values: &[Value]) -> Vec<OscArg> {
    values
        .iter()
        .filter_map(|value| match value {
            Value::Number(n) => n.as_f64().map(|f| OscArg::Float(f as f32)),
            Value::String(s) => Some(OscArg::String(s.clone())),
            Value::Bool(b) => Some(OscArg::bool(*b)),
            other => {
                debug!(value = %other, "skipping unsupported argument value");
                None
            }
        })
        .collect()
}

fn parse_number(token: &str) -> Option<OscArg> {
    let value: f64 = token.parse().ok().filter(|v: &f64| v.is_finite())?;
    if token.contains('.') {
        return Some(OscArg::Float(value as f32));
    }
    if value.fract() == 0.0 && value >= i32::MIN as f64 && value <= i32::MAX as f64 {
        Some(OscArg::Int(value as i32))
    } else {
        Some(OscArg::Float(value as f32))
    }
}

fn finish_string(text: &str, strategy: TokenizeStrategy) -> String {
    match strategy {
        TokenizeStrategy::Sanitised => text.replace(['"', '\''], ""),
        TokenizeStrategy::Verbatim => text.to_string(),
    }
}
