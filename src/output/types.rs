//! Output message types

use crate::state::SyncState;
use crate::types::Record;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

/// A message emitted downstream during a sync
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// An upserted record
    Record {
        /// Stream name
        stream: String,
        /// Record data
        data: Record,
        /// Timestamp when the record was emitted
        emitted_at: DateTime<Utc>,
    },

    /// A durably persisted state checkpoint
    State(SyncState),
}

impl Message {
    /// Create a record message
    pub fn record(stream: impl Into<String>, data: Record) -> Self {
        Self::Record {
            stream: stream.into(),
            data,
            emitted_at: Utc::now(),
        }
    }

    /// Create a state message
    pub fn state(state: SyncState) -> Self {
        Self::State(state)
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State(_))
    }

    /// Wire form, one JSON object per message
    pub fn to_json(&self) -> Value {
        match self {
            Self::Record {
                stream,
                data,
                emitted_at,
            } => json!({
                "type": "RECORD",
                "record": {
                    "stream": stream,
                    "action": "upsert",
                    "data": data,
                    "emitted_at": emitted_at.timestamp_millis()
                }
            }),
            Self::State(state) => json!({
                "type": "STATE",
                "state": state
            }),
        }
    }
}
