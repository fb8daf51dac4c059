//! State sink implementations
//!
//! A sink is an opaque persistence boundary for serialized state.

use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

/// Persistence boundary for serialized sync state
#[async_trait]
pub trait StateSink: Send + Sync {
    /// Read the last written state, if any
    async fn read_state(&self) -> Result<Option<Bytes>>;

    /// Replace the stored state. Readers observe either the old or the new
    /// state, never a mix.
    async fn write_state(&self, state: Bytes) -> Result<()>;
}

// ============================================================================
// File Sink
// ============================================================================

/// File-backed sink with atomic replace
#[derive(Debug, Clone)]
pub struct FileStateSink {
    /// Path to the state file
    path: PathBuf,
}

impl FileStateSink {
    /// Create a sink writing to `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the state file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }
}

#[async_trait]
impl StateSink for FileStateSink {
    async fn read_state(&self) -> Result<Option<Bytes>> {
        match tokio::fs::read(&self.path).await {
            Ok(contents) => Ok(Some(Bytes::from(contents))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::State {
                message: format!("Failed to read state file: {e}"),
            }),
        }
    }

    async fn write_state(&self, state: Bytes) -> Result<()> {
        // Write to temp file first, then rename for atomicity
        let temp_path = self.temp_path();
        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to create state file: {e}"),
            })?;
        file.write_all(&state).await.map_err(|e| Error::State {
            message: format!("Failed to write state file: {e}"),
        })?;
        file.sync_all().await.map_err(|e| Error::State {
            message: format!("Failed to flush state file: {e}"),
        })?;
        drop(file);

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to rename state file: {e}"),
            })?;

        Ok(())
    }
}

// ============================================================================
// Memory Sink
// ============================================================================

/// In-memory sink; clones share the same storage
#[derive(Debug, Clone, Default)]
pub struct MemoryStateSink {
    state: Arc<RwLock<Option<Bytes>>>,
}

impl MemoryStateSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink pre-loaded with serialized state
    pub fn with_state(state: impl Into<Bytes>) -> Self {
        Self {
            state: Arc::new(RwLock::new(Some(state.into()))),
        }
    }

    /// Raw stored bytes
    pub async fn contents(&self) -> Option<Bytes> {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl StateSink for MemoryStateSink {
    async fn read_state(&self) -> Result<Option<Bytes>> {
        Ok(self.state.read().await.clone())
    }

    async fn write_state(&self, state: Bytes) -> Result<()> {
        *self.state.write().await = Some(state);
        Ok(())
    }
}
