//! Replication policy module
//!
//! Decides per stream whether it is replicated incrementally (bookmark
//! driven) or as a full table, and reads replication-key values out of
//! records.

use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::types::{OptionStringExt, Record, ReplicationMethod};
use crate::watermark::{self, Watermark};

/// Resolved replication strategy of a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replication {
    /// Bookmark-driven, tracking the named replication key
    Incremental {
        /// Replication key field name
        key: String,
    },
    /// Re-read every sync, never bookmarked
    FullTable,
}

impl Replication {
    /// The replication method this strategy corresponds to
    pub fn method(&self) -> ReplicationMethod {
        match self {
            Self::Incremental { .. } => ReplicationMethod::Incremental,
            Self::FullTable => ReplicationMethod::FullTable,
        }
    }

    /// Replication key, for incremental streams
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Incremental { key } => Some(key),
            Self::FullTable => None,
        }
    }
}

/// Replication method of a stream.
///
/// The explicit method wins; otherwise a declared replication key means
/// INCREMENTAL.
pub fn method_for(stream: &StreamConfig) -> ReplicationMethod {
    match stream.replication_method {
        Some(method) => method,
        None if stream.replication_key.clone().none_if_empty().is_some() => {
            ReplicationMethod::Incremental
        }
        None => ReplicationMethod::FullTable,
    }
}

/// Whether the stream carries a watermark
pub fn is_bookmarkable(stream: &StreamConfig) -> bool {
    method_for(stream) == ReplicationMethod::Incremental
}

/// Resolve and validate the replication strategy.
///
/// A stream has a replication key if and only if it is INCREMENTAL.
pub fn replication_for(stream: &StreamConfig) -> Result<Replication> {
    let key = stream.replication_key.clone().none_if_empty();
    match (method_for(stream), key) {
        (ReplicationMethod::Incremental, Some(key)) => Ok(Replication::Incremental { key }),
        (ReplicationMethod::Incremental, None) => Err(Error::config(format!(
            "Stream '{}' is INCREMENTAL but declares no replication_key",
            stream.id
        ))),
        (ReplicationMethod::FullTable, None) => Ok(Replication::FullTable),
        (ReplicationMethod::FullTable, Some(key)) => Err(Error::config(format!(
            "Stream '{}' is FULL_TABLE but declares replication_key '{key}'",
            stream.id
        ))),
    }
}

/// Read the replication-key value of a record.
///
/// `Ok(None)` when the field is absent, null or a blank string; a present
/// value that is not a timestamp is a `MalformedWatermark`.
pub fn record_watermark(record: &Record, key: &str) -> Result<Option<Watermark>> {
    match record.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value) => watermark::parse_value(value).map(Some),
    }
}
