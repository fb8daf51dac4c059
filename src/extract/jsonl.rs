//! JSON Lines directory extractor
//!
//! Reads `<dir>/<stream id>.jsonl`, one JSON object per line.

use super::{at_or_after, Batch, BatchStream, Extractor};
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::replication;
use crate::types::Record;
use crate::watermark::Watermark;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extractor over a directory of JSONL files
#[derive(Debug, Clone)]
pub struct JsonlExtractor {
    /// Directory holding one file per stream
    dir: PathBuf,
    /// Records per yielded batch
    batch_size: usize,
}

impl JsonlExtractor {
    /// Create an extractor over `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            batch_size: 500,
        }
    }

    /// Set records per batch
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// File backing a stream
    pub fn stream_path(&self, stream: &str) -> PathBuf {
        self.dir.join(format!("{stream}.jsonl"))
    }

    fn parse(stream: &str, body: &str) -> Result<Vec<Record>> {
        let mut records = Vec::new();

        for (line_num, line) in body.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let value: Value = serde_json::from_str(line).map_err(|e| {
                Error::extraction(
                    stream,
                    format!("Failed to parse JSONL at line {}: {e}", line_num + 1),
                )
            })?;

            match value {
                Value::Object(record) => records.push(record),
                other => {
                    return Err(Error::extraction(
                        stream,
                        format!(
                            "Expected a JSON object at line {}, got {other}",
                            line_num + 1
                        ),
                    ))
                }
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl Extractor for JsonlExtractor {
    async fn extract(
        &self,
        stream: &StreamConfig,
        start: Option<&Watermark>,
    ) -> Result<BatchStream> {
        let path = self.stream_path(&stream.id);
        let body = tokio::fs::read_to_string(&path).await.map_err(|e| {
            Error::extraction(&stream.id, format!("Failed to read {}: {e}", path.display()))
        })?;

        let mut records = Self::parse(&stream.id, &body)?;
        let total = records.len();

        let replication = replication::replication_for(stream)?;
        if let (Some(key), Some(start)) = (replication.key(), start) {
            records.retain(|record| at_or_after(record, key, start));
        }
        debug!(
            stream = %stream.id,
            total,
            selected = records.len(),
            "Read JSONL records"
        );

        let batches: Vec<Batch> = records
            .chunks(self.batch_size)
            .map(<[Record]>::to_vec)
            .collect();
        Ok(Box::pin(futures::stream::iter(batches.into_iter().map(Ok))))
    }
}
