//! Engine types
//!
//! Phases, configuration, statistics and cancellation for the sync engine.

use crate::config::ConnectorConfig;
use crate::state::SyncState;
use crate::types::ReplicationMethod;
use crate::watermark::Watermark;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Where a sync is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPhase {
    /// No stream selected yet
    Idle,
    /// Loading state and computing the traversal order
    Resolving,
    /// Extracting the named stream
    StreamActive(String),
    /// The named stream finished and its boundary was checkpointed
    StreamDone(String),
    /// All streams done, final state persisted
    Completed,
    /// Stopped abnormally; the last persisted state is authoritative
    Interrupted,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Resolving => write!(f, "resolving"),
            Self::StreamActive(stream) => write!(f, "stream_active({stream})"),
            Self::StreamDone(stream) => write!(f, "stream_done({stream})"),
            Self::Completed => write!(f, "completed"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Configuration for sync operation
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    /// Starting watermark for incremental streams without a bookmark
    pub start_date: Option<Watermark>,
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the start date
    #[must_use]
    pub fn with_start_date(mut self, start_date: Watermark) -> Self {
        self.start_date = Some(start_date);
        self
    }

    /// Take sync settings from the connector configuration
    pub fn from_connector(config: &ConnectorConfig) -> Self {
        Self {
            start_date: config.start_date,
        }
    }
}

/// Statistics from a sync operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Records emitted downstream
    pub records_emitted: usize,
    /// Incremental records without a replication-key value
    pub records_missing_key: usize,
    /// Incremental records whose replication-key value did not parse
    pub malformed_values: usize,
    /// Incremental records below the stream's starting watermark
    pub records_below_start: usize,
    /// Streams that reached their boundary checkpoint
    pub streams_completed: usize,
    /// State snapshots durably written
    pub checkpoints_written: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }
}

/// Outcome of one stream within a sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamSummary {
    /// Stream id
    pub stream: String,
    /// Replication method used
    pub method: ReplicationMethod,
    /// Records emitted
    pub records: usize,
    /// Watermark after the stream finished (incremental only)
    pub watermark: Option<Watermark>,
}

/// Result of a completed sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Streams in the order they ran
    pub streams: Vec<StreamSummary>,
    /// Final persisted state
    pub final_state: SyncState,
    /// Aggregate statistics
    pub stats: SyncStats,
}

impl SyncReport {
    /// Summary for one stream
    pub fn stream(&self, stream: &str) -> Option<&StreamSummary> {
        self.streams.iter().find(|s| s.stream == stream)
    }

    /// Stream ids in processing order
    pub fn order(&self) -> Vec<&str> {
        self.streams.iter().map(|s| s.stream.as_str()).collect()
    }
}

/// Cooperative cancellation flag; clones share the flag
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    /// Create an unset signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
