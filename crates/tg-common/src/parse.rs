//! Silent-degrade decoding.
//!
//! Log lines, provider override maps, and other loosely-produced inputs are
//! decoded through these helpers so that every call site degrades the same
//! way: a value that fails to decode becomes the caller's fallback and
//! processing continues.

use serde::de::DeserializeOwned;

/// Decode `raw` as JSON into `T`, or return `default` if it does not decode.
///
/// Decoding into `Option<T>` with a `None` default is the idiomatic way to
/// distinguish "decoded" from "dropped" at a call site:
///
/// ```
/// use tg_common::parse_or_default;
///
/// let n: Option<u32> = parse_or_default("42", None);
/// assert_eq!(n, Some(42));
/// let bad: Option<u32> = parse_or_default("{not json", None);
/// assert_eq!(bad, None);
/// ```
pub fn parse_or_default<T: DeserializeOwned>(raw: &str, default: T) -> T {
    serde_json::from_str(raw).unwrap_or(default)
}

/// Decode an already-parsed JSON value into `T`, or return `default`.
pub fn parse_value_or_default<T: DeserializeOwned>(value: serde_json::Value, default: T) -> T {
    serde_json::from_value(value).unwrap_or(default)
}
