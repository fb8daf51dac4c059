// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Bookmark Engine
//!
//! Bookmark and resumption state for multi-stream incremental connectors.
//!
//! A sync walks the selected streams in a fixed order. Incremental streams
//! resume from a per-stream watermark; full-table streams are re-read in
//! full. State is persisted at every stream boundary, so an interrupted
//! sync resumes at the stream it was working on without losing progress.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bookmark_engine::checkpoint::{Checkpointer, FileStateSink};
//! use bookmark_engine::engine::{SyncConfig, SyncEngine};
//! use bookmark_engine::extract::JsonlExtractor;
//! use bookmark_engine::output::JsonLinesOutput;
//! use bookmark_engine::{load_config, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = load_config("connector.yaml")?;
//!     let catalog = config.catalog()?;
//!
//!     let checkpointer = Checkpointer::new(FileStateSink::new("state.json")).with_config(&config);
//!     let mut engine = SyncEngine::new(checkpointer).with_config(SyncConfig::from_connector(&config));
//!
//!     let extractor = JsonlExtractor::new("data/");
//!     let mut output = JsonLinesOutput::stdout();
//!     let report = engine.run(&catalog, &extractor, &mut output, None).await?;
//!     println!("{} records", report.stats.records_emitted);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        SyncEngine                            │
//! │  Idle → Resolving → StreamActive → StreamDone → … Completed  │
//! └──────────────────────────────────────────────────────────────┘
//!          │                 │                  │
//! ┌────────┴──────┬──────────┴───────┬──────────┴───────┬──────────┐
//! │  Checkpointer │  BookmarkStore   │  Replication     │ Extractor│
//! ├───────────────┼──────────────────┼──────────────────┼──────────┤
//! │ Load/override │ Watermarks       │ INCREMENTAL      │ JSONL    │
//! │ Persist/retry │ current_stream   │ FULL_TABLE       │ Memory   │
//! │ File/Memory   │ Snapshots        │ Watermark parse  │          │
//! └───────────────┴──────────────────┴──────────────────┴──────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Watermark parsing and ordering
pub mod watermark;

/// Replication method policy
pub mod replication;

/// Connector configuration and catalog
pub mod config;

/// Sync state, overrides and the bookmark store
pub mod state;

/// State persistence
pub mod checkpoint;

/// Record extraction
pub mod extract;

/// Downstream message transport
pub mod output;

/// Main execution engine
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{load_config, load_config_from_str, Catalog, ConnectorConfig, StreamConfig};
pub use engine::{SyncEngine, SyncReport};
pub use state::{BookmarkStore, StateOverride, SyncState};
pub use watermark::Watermark;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
