//! Watermark value type
//!
//! A watermark is a replication-key timestamp, always held in UTC at
//! microsecond precision.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Canonical output format: `2024-01-10T00:00:00.000000Z`
const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Offset-carrying formats that are not strict RFC 3339
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Formats without an offset, read as UTC
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// High-water mark of a stream's replication key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Watermark(DateTime<Utc>);

impl Watermark {
    /// Create a watermark from a UTC timestamp, truncated to microseconds
    pub fn from_datetime(value: DateTime<Utc>) -> Self {
        Self(value.trunc_subsecs(6))
    }

    /// Parse a watermark from any supported timestamp representation.
    ///
    /// Accepts RFC 3339 with any offset, naive date-times (read as UTC)
    /// and bare dates (midnight UTC).
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Error::malformed_watermark(value, "empty timestamp"));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self::from_datetime(dt.with_timezone(&Utc)));
        }

        for format in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
                return Ok(Self::from_datetime(dt.with_timezone(&Utc)));
            }
        }

        let naive = trimmed.trim_end_matches('Z');
        for format in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
                return Ok(Self::from_datetime(dt.and_utc()));
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(naive, "%Y-%m-%d") {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(Self::from_datetime(dt.and_utc()));
            }
        }

        Err(Error::malformed_watermark(
            value,
            "expected an ISO-8601 timestamp",
        ))
    }

    /// The underlying UTC timestamp
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Canonical string form with microsecond precision and `Z` suffix
    pub fn to_canonical(&self) -> String {
        self.0.format(CANONICAL_FORMAT).to_string()
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

impl FromStr for Watermark {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<DateTime<Utc>> for Watermark {
    fn from(value: DateTime<Utc>) -> Self {
        Self::from_datetime(value)
    }
}

impl Serialize for Watermark {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical())
    }
}

impl<'de> Deserialize<'de> for Watermark {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
