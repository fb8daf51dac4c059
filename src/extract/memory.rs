//! In-memory extractor
//!
//! Serves fixed record sets per stream. Used by tests and embedders that
//! already hold the data; supports failure injection.

use super::{at_or_after, Batch, BatchStream, Extractor};
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::replication;
use crate::types::Record;
use crate::watermark::Watermark;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One recorded `extract` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractCall {
    /// Stream id
    pub stream: String,
    /// Starting watermark handed to the extractor
    pub start: Option<Watermark>,
}

/// Extractor over in-memory records
#[derive(Debug, Clone)]
pub struct MemoryExtractor {
    /// Records per stream
    records: HashMap<String, Vec<Record>>,
    /// Records per yielded batch
    batch_size: usize,
    /// Whether records below the starting watermark are dropped
    filter_below_start: bool,
    /// Stream → number of batches yielded before failing
    failures: HashMap<String, usize>,
    /// Invocation log, shared between clones
    calls: Arc<Mutex<Vec<ExtractCall>>>,
}

impl Default for MemoryExtractor {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            batch_size: 100,
            filter_below_start: true,
            failures: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MemoryExtractor {
    /// Create an empty extractor
    pub fn new() -> Self {
        Self::default()
    }

    /// Set records for a stream. Non-object values are ignored.
    #[must_use]
    pub fn with_records(
        mut self,
        stream: impl Into<String>,
        records: impl IntoIterator<Item = serde_json::Value>,
    ) -> Self {
        let records = records
            .into_iter()
            .filter_map(|value| match value {
                serde_json::Value::Object(record) => Some(record),
                _ => None,
            })
            .collect();
        self.records.insert(stream.into(), records);
        self
    }

    /// Set records per batch
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Deliver every record regardless of the starting watermark
    #[must_use]
    pub fn without_filtering(mut self) -> Self {
        self.filter_below_start = false;
        self
    }

    /// Fail `stream` after yielding `after_batches` batches
    #[must_use]
    pub fn fail_stream(mut self, stream: impl Into<String>, after_batches: usize) -> Self {
        self.failures.insert(stream.into(), after_batches);
        self
    }

    /// Every `extract` call so far, in order
    pub async fn calls(&self) -> Vec<ExtractCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Extractor for MemoryExtractor {
    async fn extract(
        &self,
        stream: &StreamConfig,
        start: Option<&Watermark>,
    ) -> Result<BatchStream> {
        self.calls.lock().await.push(ExtractCall {
            stream: stream.id.clone(),
            start: start.copied(),
        });

        let mut records = self.records.get(&stream.id).cloned().unwrap_or_default();
        let replication = replication::replication_for(stream)?;
        if let (true, Some(key), Some(start)) = (self.filter_below_start, replication.key(), start)
        {
            records.retain(|record| at_or_after(record, key, start));
        }

        let mut items: Vec<Result<Batch>> = records
            .chunks(self.batch_size)
            .map(|chunk| Ok(chunk.to_vec()))
            .collect();
        if let Some(&after) = self.failures.get(&stream.id) {
            items.truncate(after);
            items.push(Err(Error::extraction(&stream.id, "injected failure")));
        }

        Ok(Box::pin(futures::stream::iter(items)))
    }
}
