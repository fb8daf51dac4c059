//! Configuration types for connector definitions
//!
//! This module contains the catalog (stream definitions) and the sync
//! settings, loaded from YAML.

use crate::error::{Error, Result};
use crate::replication;
use crate::types::{OptionStringExt, ReplicationMethod};
use crate::watermark::Watermark;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

// ============================================================================
// Top-Level Connector Config
// ============================================================================

/// Complete connector configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Connector name
    pub name: String,

    /// Starting watermark for incremental streams without a bookmark
    #[serde(default)]
    pub start_date: Option<Watermark>,

    /// Records per extractor batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Extra attempts when a state write fails
    #[serde(default = "default_persist_retries")]
    pub persist_retries: u32,

    /// Delay between state write attempts
    #[serde(default = "default_persist_retry_delay_ms")]
    pub persist_retry_delay_ms: u64,

    /// Stream definitions
    #[serde(default)]
    pub streams: Vec<StreamConfig>,
}

fn default_batch_size() -> usize {
    500
}

fn default_persist_retries() -> u32 {
    2
}

fn default_persist_retry_delay_ms() -> u64 {
    100
}

impl ConnectorConfig {
    /// Build the validated catalog from the stream definitions
    pub fn catalog(&self) -> Result<Catalog> {
        Catalog::new(self.streams.clone())
    }

    /// Validate the whole configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::missing_field("name"));
        }
        if self.batch_size == 0 {
            return Err(Error::config("batch_size must be greater than zero"));
        }
        self.catalog().map(|_| ())
    }
}

// ============================================================================
// Stream Config
// ============================================================================

/// Definition of a single stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Stable stream identifier
    pub id: String,

    /// Primary key field names
    #[serde(default)]
    pub primary_key: Vec<String>,

    /// Replication key field name (incremental streams only)
    #[serde(default)]
    pub replication_key: Option<String>,

    /// Explicit replication method; derived from `replication_key` when absent
    #[serde(default)]
    pub replication_method: Option<ReplicationMethod>,

    /// Whether the stream takes part in the sync
    #[serde(default = "default_selected")]
    pub selected: bool,
}

fn default_selected() -> bool {
    true
}

impl StreamConfig {
    /// Create an incremental stream definition
    pub fn incremental(id: impl Into<String>, replication_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            primary_key: Vec::new(),
            replication_key: Some(replication_key.into()),
            replication_method: Some(ReplicationMethod::Incremental),
            selected: true,
        }
    }

    /// Create a full-table stream definition
    pub fn full_table(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            primary_key: Vec::new(),
            replication_key: None,
            replication_method: Some(ReplicationMethod::FullTable),
            selected: true,
        }
    }

    /// Set the primary key
    #[must_use]
    pub fn with_primary_key<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Set the selection flag
    #[must_use]
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Fields always extracted regardless of field selection:
    /// primary keys plus the replication key
    pub fn automatic_fields(&self) -> BTreeSet<String> {
        self.primary_key
            .iter()
            .cloned()
            .chain(self.replication_key.clone().none_if_empty())
            .collect()
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Validated, read-only set of stream definitions
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    streams: Vec<StreamConfig>,
}

impl Catalog {
    /// Validate stream definitions and build a catalog
    pub fn new(streams: Vec<StreamConfig>) -> Result<Self> {
        let mut seen = HashSet::new();
        for stream in &streams {
            if stream.id.trim().is_empty() {
                return Err(Error::missing_field("streams[].id"));
            }
            if !seen.insert(stream.id.as_str()) {
                return Err(Error::config(format!(
                    "Duplicate stream id '{}'",
                    stream.id
                )));
            }
            replication::replication_for(stream)?;
        }

        Ok(Self { streams })
    }

    /// All streams, selected or not
    pub fn streams(&self) -> &[StreamConfig] {
        &self.streams
    }

    /// Look up a stream by id
    pub fn get(&self, id: &str) -> Option<&StreamConfig> {
        self.streams.iter().find(|s| s.id == id)
    }

    /// Selected streams in traversal order
    pub fn selected(&self) -> Vec<&StreamConfig> {
        let mut selected: Vec<_> = self.streams.iter().filter(|s| s.selected).collect();
        selected.sort_by(|a, b| a.id.cmp(&b.id));
        selected
    }

    /// Deterministic processing order over the selected stream ids.
    ///
    /// Sorted by id so that reordering the catalog file never changes how
    /// `current_stream` partitions the streams.
    pub fn traversal_order(&self) -> Vec<String> {
        self.selected().into_iter().map(|s| s.id.clone()).collect()
    }

    /// Whether a stream is in the current selection
    pub fn is_selected(&self, id: &str) -> bool {
        self.get(id).is_some_and(|s| s.selected)
    }
}

// ============================================================================
// Loader Functions
// ============================================================================

/// Load a connector configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ConnectorConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("Failed to read config '{}': {e}", path.display()))
    })?;
    load_config_from_str(&content)
}

/// Load a connector configuration from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<ConnectorConfig> {
    let config: ConnectorConfig = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
}
