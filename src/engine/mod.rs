//! Execution engine module
//!
//! Main sync loop and stream orchestration.
//!
//! # Overview
//!
//! The engine drives one sync through
//! `Idle → Resolving → StreamActive(s) → StreamDone(s) → … → Completed`,
//! falling into `Interrupted` on any fatal error or cancellation.
//!
//! Streams run one at a time. After each stream the state is persisted
//! with `current_stream` pointing at the next stream; that write is the
//! only durability point. A resumed sync rotates the traversal order so
//! the interrupted stream runs first and the remaining streams follow in
//! their original order.

mod types;

pub use types::{CancelSignal, StreamSummary, SyncConfig, SyncPhase, SyncReport, SyncStats};

use crate::checkpoint::Checkpointer;
use crate::config::{Catalog, StreamConfig};
use crate::error::{Error, Result};
use crate::extract::Extractor;
use crate::output::{Message, OutputTransport};
use crate::replication::{self, Replication};
use crate::state::{BookmarkStore, StateOverride, SyncState};
use crate::types::Record;
use crate::watermark::Watermark;
use futures::StreamExt;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Rotate `order` so that `current` comes first, keeping the rest in order
pub fn resolve_order(mut order: Vec<String>, current: Option<&str>) -> Vec<String> {
    if let Some(position) = current.and_then(|c| order.iter().position(|s| s == c)) {
        order.rotate_left(position);
    }
    order
}

/// Sync engine for orchestrating stream extraction and checkpointing
pub struct SyncEngine {
    /// State persistence
    checkpointer: Checkpointer,
    /// Sync configuration
    config: SyncConfig,
    /// Cancellation flag
    cancel: CancelSignal,
    /// Current phase
    phase: SyncPhase,
    /// Statistics
    stats: SyncStats,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(checkpointer: Checkpointer) -> Self {
        Self {
            checkpointer,
            config: SyncConfig::default(),
            cancel: CancelSignal::new(),
            phase: SyncPhase::Idle,
            stats: SyncStats::default(),
        }
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an externally owned cancellation signal
    #[must_use]
    pub fn with_cancel_signal(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that cancels this engine's sync
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Current phase
    pub fn phase(&self) -> &SyncPhase {
        &self.phase
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Run one sync over the selected streams of `catalog`.
    ///
    /// On error the engine ends in `Interrupted` and the last persisted
    /// state stays the resume point.
    pub async fn run(
        &mut self,
        catalog: &Catalog,
        extractor: &dyn Extractor,
        output: &mut dyn OutputTransport,
        state_override: Option<&StateOverride>,
    ) -> Result<SyncReport> {
        if self.phase != SyncPhase::Idle {
            return Err(Error::state(format!(
                "Sync engine already used (phase: {})",
                self.phase
            )));
        }

        let start = Instant::now();
        let result = self
            .drive(catalog, extractor, output, state_override)
            .await;
        self.stats.duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok((streams, final_state)) => {
                info!(
                    streams = streams.len(),
                    records = self.stats.records_emitted,
                    checkpoints = self.stats.checkpoints_written,
                    duration_ms = self.stats.duration_ms,
                    "Sync completed"
                );
                Ok(SyncReport {
                    streams,
                    final_state,
                    stats: self.stats.clone(),
                })
            }
            Err(e) => {
                error!(phase = %self.phase, error = %e, "Sync interrupted");
                self.transition(SyncPhase::Interrupted);
                Err(e)
            }
        }
    }

    async fn drive(
        &mut self,
        catalog: &Catalog,
        extractor: &dyn Extractor,
        output: &mut dyn OutputTransport,
        state_override: Option<&StateOverride>,
    ) -> Result<(Vec<StreamSummary>, SyncState)> {
        self.transition(SyncPhase::Resolving);

        let loaded = self.checkpointer.load(catalog, state_override).await?;
        let mut store = BookmarkStore::from_state(catalog, &loaded)?;
        let order = resolve_order(catalog.traversal_order(), store.current_stream());
        info!(
            order = ?order,
            resume_from = ?store.current_stream(),
            "Resolved traversal order"
        );

        // Make an operator override durable before any stream runs
        if state_override.is_some_and(|o| !o.is_empty()) {
            self.checkpoint(store.snapshot(), output).await?;
        }

        let mut summaries = Vec::with_capacity(order.len());
        for (index, stream_id) in order.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(stream = %stream_id, "Cancellation requested before stream start");
                return Err(Error::Interrupted {
                    stream: stream_id.clone(),
                });
            }

            let stream = catalog
                .get(stream_id)
                .ok_or_else(|| Error::unknown_stream(stream_id))?;

            store.set_current_stream(Some(stream_id.clone()))?;
            self.transition(SyncPhase::StreamActive(stream_id.clone()));
            let summary = self
                .sync_stream(stream, &mut store, extractor, output)
                .await?;
            self.transition(SyncPhase::StreamDone(stream_id.clone()));

            // Persist first; only then move the in-memory marker
            let next = order.get(index + 1).cloned();
            let mut snapshot = store.snapshot();
            snapshot.current_stream.clone_from(&next);
            self.checkpoint(snapshot, output).await?;
            store.set_current_stream(next)?;

            self.stats.streams_completed += 1;
            summaries.push(summary);
        }

        self.transition(SyncPhase::Completed);
        let final_state = store.snapshot();
        self.checkpoint(final_state.clone(), output).await?;

        Ok((summaries, final_state))
    }

    /// Extract one stream, emitting records and advancing its watermark
    async fn sync_stream(
        &mut self,
        stream: &StreamConfig,
        store: &mut BookmarkStore,
        extractor: &dyn Extractor,
        output: &mut dyn OutputTransport,
    ) -> Result<StreamSummary> {
        let replication = replication::replication_for(stream)?;
        let start = match &replication {
            Replication::Incremental { .. } => store.get(&stream.id)?.or(self.config.start_date),
            Replication::FullTable => None,
        };

        info!(
            stream = %stream.id,
            method = %replication.method(),
            start = ?start.map(|w| w.to_canonical()),
            "Starting sync for stream"
        );

        let mut batches = extractor
            .extract(stream, start.as_ref())
            .await
            .map_err(|e| as_extraction_failure(&stream.id, e))?;

        let mut records = 0usize;
        while let Some(batch) = batches.next().await {
            let batch = batch.map_err(|e| as_extraction_failure(&stream.id, e))?;
            debug!(stream = %stream.id, size = batch.len(), "Processing batch");

            for record in batch {
                if let Replication::Incremental { key } = &replication {
                    self.track_record(store, &stream.id, key, start.as_ref(), &record)?;
                }
                output.send(Message::record(&stream.id, record)).await?;
                records += 1;
                self.stats.records_emitted += 1;
            }

            if self.cancel.is_cancelled() {
                warn!(stream = %stream.id, records, "Cancellation requested, stopping after batch");
                return Err(Error::Interrupted {
                    stream: stream.id.clone(),
                });
            }
        }

        let watermark = store.get(&stream.id)?;
        info!(
            stream = %stream.id,
            records,
            watermark = ?watermark.map(|w| w.to_canonical()),
            "Completed sync for stream"
        );

        Ok(StreamSummary {
            stream: stream.id.clone(),
            method: replication.method(),
            records,
            watermark,
        })
    }

    /// Advance the watermark from one incremental record.
    ///
    /// Missing or malformed values are logged and skipped; the record is
    /// still emitted by the caller.
    fn track_record(
        &mut self,
        store: &mut BookmarkStore,
        stream: &str,
        key: &str,
        start: Option<&Watermark>,
        record: &Record,
    ) -> Result<()> {
        match replication::record_watermark(record, key) {
            Ok(Some(value)) => {
                if start.is_some_and(|s| value < *s) {
                    self.stats.records_below_start += 1;
                    debug!(stream, value = %value, "Record below starting watermark");
                }
                store.advance(stream, &value)
            }
            Ok(None) => {
                self.stats.records_missing_key += 1;
                warn!(stream, replication_key = key, "Record has no replication key value");
                Ok(())
            }
            Err(e) if !e.is_fatal_to_sync() => {
                self.stats.malformed_values += 1;
                warn!(stream, replication_key = key, error = %e, "Skipping malformed replication key value");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Persist a snapshot, then announce it downstream
    async fn checkpoint(
        &mut self,
        snapshot: SyncState,
        output: &mut dyn OutputTransport,
    ) -> Result<()> {
        self.checkpointer.persist(&snapshot).await?;
        self.stats.checkpoints_written += 1;
        output.send(Message::state(snapshot)).await
    }

    fn transition(&mut self, phase: SyncPhase) {
        debug!(from = %self.phase, to = %phase, "Phase transition");
        self.phase = phase;
    }
}

fn as_extraction_failure(stream: &str, error: Error) -> Error {
    match error {
        Error::ExtractionFailure { .. } => error,
        other => Error::extraction(stream, other.to_string()),
    }
}

#[cfg(test)]
mod tests;
