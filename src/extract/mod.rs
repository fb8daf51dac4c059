//! Extraction module
//!
//! The extractor is the collaborator that actually fetches records. The
//! engine hands it a stream definition and a starting watermark and reads
//! back a finite stream of record batches.
//!
//! Filtering records below the starting watermark is the extractor's job;
//! the engine only tracks the maximum it sees.

mod jsonl;
mod memory;

pub use jsonl::JsonlExtractor;
pub use memory::{ExtractCall, MemoryExtractor};

use crate::config::StreamConfig;
use crate::error::Result;
use crate::replication;
use crate::types::Record;
use crate::watermark::Watermark;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// A batch of records from one stream
pub type Batch = Vec<Record>;

/// Stream of record batches returned by an extractor
pub type BatchStream = Pin<Box<dyn Stream<Item = Result<Batch>> + Send>>;

/// Source of records for one stream at a time
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Start extracting `stream` from `start` (inclusive).
    ///
    /// Calling again with the same `start` after a failure must be safe.
    /// Transient errors are retried here; an error yielded from the
    /// returned stream is final for the stream.
    async fn extract(&self, stream: &StreamConfig, start: Option<&Watermark>)
        -> Result<BatchStream>;
}

/// Whether a record belongs to a sync starting at `start`.
///
/// Records without a usable replication-key value are kept so the engine
/// can report them.
pub(crate) fn at_or_after(record: &Record, key: &str, start: &Watermark) -> bool {
    match replication::record_watermark(record, key) {
        Ok(Some(value)) => value >= *start,
        Ok(None) | Err(_) => true,
    }
}
