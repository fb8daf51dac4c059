//! Watermark comparison module
//!
//! Pure logic for ordering replication-key values and advancing a
//! stream's watermark. Values are compared as instants, never as raw
//! strings, so `2020-08-25T13:17:36-07:00` and `2020-08-25T20:17:36Z`
//! are equal.

mod types;

pub use types::Watermark;

use crate::error::{Error, Result};
use crate::types::JsonValue;
use std::cmp::Ordering;

/// Order two watermarks
pub fn compare(a: &Watermark, b: &Watermark) -> Ordering {
    a.cmp(b)
}

/// Order two raw timestamp strings after normalizing both to UTC
pub fn compare_str(a: &str, b: &str) -> Result<Ordering> {
    Ok(compare(&Watermark::parse(a)?, &Watermark::parse(b)?))
}

/// New watermark after seeing `candidate`: max(current, candidate)
pub fn max_merge(current: Option<&Watermark>, candidate: &Watermark) -> Watermark {
    match current {
        Some(current) if current >= candidate => *current,
        _ => *candidate,
    }
}

/// Read a replication-key value out of a record field.
///
/// Only string timestamps are accepted; any other JSON type is malformed.
pub fn parse_value(value: &JsonValue) -> Result<Watermark> {
    match value {
        JsonValue::String(s) => Watermark::parse(s),
        other => Err(Error::malformed_watermark(
            other.to_string(),
            "replication key value is not a timestamp string",
        )),
    }
}

#[cfg(test)]
mod tests;
