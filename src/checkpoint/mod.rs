//! Checkpointing module
//!
//! Loads prior state (merged with an optional operator override) at sync
//! start and durably writes state snapshots at stream boundaries.
//!
//! # Overview
//!
//! The checkpoint module provides:
//! - `StateSink` - Persistence boundary (`FileStateSink`, `MemoryStateSink`)
//! - `Checkpointer` - Load/merge and retrying, synchronous persist

mod sink;

pub use sink::{FileStateSink, MemoryStateSink, StateSink};

use crate::config::{Catalog, ConnectorConfig};
use crate::error::{Error, Result};
use crate::state::{StateOverride, SyncState};
use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Writes state snapshots to a sink
pub struct Checkpointer {
    /// Underlying sink
    sink: Box<dyn StateSink>,
    /// Extra attempts after a failed write
    retries: u32,
    /// Delay between attempts
    retry_delay: Duration,
    /// Successful writes so far
    checkpoints_written: u64,
}

impl Checkpointer {
    /// Create a checkpointer with no write retries
    pub fn new(sink: impl StateSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            retries: 0,
            retry_delay: Duration::ZERO,
            checkpoints_written: 0,
        }
    }

    /// Set retry policy for failed writes
    #[must_use]
    pub fn with_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = delay;
        self
    }

    /// Take the retry policy from the connector configuration
    #[must_use]
    pub fn with_config(self, config: &ConnectorConfig) -> Self {
        self.with_retries(
            config.persist_retries,
            Duration::from_millis(config.persist_retry_delay_ms),
        )
    }

    /// Number of successful writes
    pub fn checkpoints_written(&self) -> u64 {
        self.checkpoints_written
    }

    /// Read the last persisted state; absent means empty
    pub async fn read(&self) -> Result<SyncState> {
        match self.sink.read_state().await? {
            Some(bytes) => SyncState::from_slice(&bytes),
            None => Ok(SyncState::new()),
        }
    }

    /// Load the last persisted state and merge an operator override onto it
    pub async fn load(
        &self,
        catalog: &Catalog,
        state_override: Option<&StateOverride>,
    ) -> Result<SyncState> {
        let mut state = self.read().await?;
        debug!(
            bookmarks = state.bookmarks.len(),
            current_stream = ?state.current_stream,
            "Loaded persisted state"
        );

        if let Some(state_override) = state_override.filter(|o| !o.is_empty()) {
            state_override.apply(&mut state, catalog)?;
            info!(
                bookmarks = state_override.bookmarks.len(),
                current_stream = ?state_override.current_stream,
                "Applied state override"
            );
        }

        Ok(state)
    }

    /// Durably write a snapshot, retrying per policy
    pub async fn persist(&mut self, state: &SyncState) -> Result<()> {
        let bytes = Bytes::from(state.to_vec()?);
        let max_attempts = self.retries + 1;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.sink.write_state(bytes.clone()).await {
                Ok(()) => {
                    self.checkpoints_written += 1;
                    debug!(
                        current_stream = ?state.current_stream,
                        attempt,
                        "Persisted state"
                    );
                    return Ok(());
                }
                Err(e) if attempt < max_attempts => {
                    warn!(attempt, max_attempts, error = %e, "State write failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    return Err(Error::PersistenceFailure {
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}
