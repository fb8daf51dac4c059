//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs:
//!
//! ```json
//! {
//!   "bookmarks": { "Account": { "UpdatedDate": "2024-01-12T00:00:00.000000Z" } },
//!   "current_stream": "Account"
//! }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Replication key name → watermark string for one stream
pub type Bookmark = BTreeMap<String, String>;

/// Complete persisted state for a connector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Per-stream bookmarks (incremental streams only)
    #[serde(default)]
    pub bookmarks: BTreeMap<String, Bookmark>,

    /// Stream that was mid-flight when the last sync stopped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stream: Option<String>,
}

impl SyncState {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse persisted bytes; empty input is an empty state
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new());
        }
        serde_json::from_slice(bytes).map_err(|e| Error::State {
            message: format!("Failed to parse state: {e}"),
        })
    }

    /// Parse a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_slice(json.as_bytes())
    }

    /// Serialize to compact JSON bytes
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::State {
            message: format!("Failed to serialize state: {e}"),
        })
    }

    /// Get a stream's bookmark value for a replication key
    pub fn get_bookmark(&self, stream: &str, key: &str) -> Option<&str> {
        self.bookmarks.get(stream)?.get(key).map(String::as_str)
    }

    /// Set a stream's bookmark value, replacing any previous entry
    pub fn set_bookmark(&mut self, stream: &str, key: &str, value: impl Into<String>) {
        let mut bookmark = Bookmark::new();
        bookmark.insert(key.to_string(), value.into());
        self.bookmarks.insert(stream.to_string(), bookmark);
    }

    /// Whether a stream has a non-empty bookmark
    pub fn has_bookmark(&self, stream: &str) -> bool {
        self.bookmarks.get(stream).is_some_and(|b| !b.is_empty())
    }
}
