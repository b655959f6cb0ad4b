use crate::error::{ArgsError, Result};

/// Parse one byte written as 1–2 hex digits with an optional `0x` prefix.
pub fn parse_hex_byte(token: &str) -> Option<u8> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);

    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}

/// Parse exactly `expected` hex bytes separated by commas and/or whitespace.
///
/// ```
/// use oscwire_args::parse_hex_bytes;
///
/// assert_eq!(parse_hex_bytes("00, 90, 45 65", 4).unwrap(), vec![0x00, 0x90, 0x45, 0x65]);
/// assert!(parse_hex_bytes("00 90 45", 4).is_err());
/// ```
pub fn parse_hex_bytes(input: &str, expected: usize) -> Result<Vec<u8>> {
    let tokens: Vec<&str> = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .collect();

    if tokens.len() != expected {
        return Err(ArgsError::ByteCount {
            expected,
            actual: tokens.len(),
        });
    }

    tokens
        .into_iter()
        .map(|token| parse_hex_byte(token).ok_or_else(|| ArgsError::InvalidHexByte(token.into())))
        .collect()
}

/// Parse any number of hex bytes, as used for blob payloads.
pub fn parse_hex_blob(input: &str) -> Result<Vec<u8>> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| parse_hex_byte(token).ok_or_else(|| ArgsError::InvalidHexByte(token.into())))
        .collect()
}

/// Truncate `value` toward zero and require it to lie in `min..=max`.
///
/// Values are never clamped: anything out of range, or not finite, fails.
pub fn checked_int(value: f64, min: i64, max: i64, name: &'static str) -> Result<i64> {
    if !value.is_finite() {
        return Err(ArgsError::NotANumber {
            name,
            input: value.to_string(),
        });
    }
    let truncated = value.trunc();
    if truncated < min as f64 || truncated > max as f64 {
        return Err(ArgsError::OutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(truncated as i64)
}

/// [`checked_int`] over text, after trimming surrounding whitespace.
pub fn parse_checked_int(input: &str, min: i64, max: i64, name: &'static str) -> Result<i64> {
    let value: f64 = input.trim().parse().map_err(|_| ArgsError::NotANumber {
        name,
        input: input.into(),
    })?;
    checked_int(value, min, max, name)
}
