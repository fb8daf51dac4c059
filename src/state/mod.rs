//! State management module
//!
//! Handles watermark tracking and the interrupted-sync marker.
//! State is persisted between sync runs to enable incremental syncs.
//!
//! # Overview
//!
//! The state module provides:
//! - `SyncState` - Persisted wire form (`bookmarks` + `current_stream`)
//! - `StateOverride` - Typed operator override merged at sync start
//! - `BookmarkStore` - Per-sync in-memory store with max-merge advancement

mod overrides;
mod store;
mod types;

pub use overrides::StateOverride;
pub use store::{BookmarkStore, StreamCursor};
pub use types::{Bookmark, SyncState};
