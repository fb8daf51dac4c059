//! Bookmark store implementation
//!
//! In-memory mapping of stream → watermark plus the `current_stream`
//! marker. One store is owned by one sync; it is threaded through the
//! orchestrator by `&mut` and never shared.

use super::types::{Bookmark, SyncState};
use crate::config::{Catalog, StreamConfig};
use crate::error::{Error, Result};
use crate::replication::{self, Replication};
use crate::watermark::{self, Watermark};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Per-stream slot in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamCursor {
    /// Incremental stream and its watermark, if one was ever recorded
    Incremental {
        /// Replication key field name
        key: String,
        /// Current high-water mark
        watermark: Option<Watermark>,
    },
    /// Full-table stream; never carries a watermark
    FullTable,
}

/// Bookmark store for one sync
#[derive(Debug, Clone, Default)]
pub struct BookmarkStore {
    /// Registered (selected) streams
    streams: BTreeMap<String, StreamCursor>,
    /// Bookmarks of streams outside the selection, in canonical form
    retained: BTreeMap<String, Bookmark>,
    /// Stream that is in flight, or next to run
    current_stream: Option<String>,
}

impl BookmarkStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store for the catalog selection from a loaded state.
    ///
    /// Bookmarks of unselected streams are retained in canonical form.
    /// Bookmarks that no longer fit the catalog (full-table stream, changed
    /// replication key) are dropped. A `current_stream` outside the selection
    /// is fatal.
    pub fn from_state(catalog: &Catalog, state: &SyncState) -> Result<Self> {
        let mut store = Self::new();
        for stream in catalog.selected() {
            store.register(stream)?;
        }

        for (stream_id, bookmark) in &state.bookmarks {
            if bookmark.is_empty() {
                continue;
            }
            if !store.is_registered(stream_id) {
                if let Some(retained) = retain_unselected(catalog, stream_id, bookmark)? {
                    debug!(stream = %stream_id, "Retaining bookmark of unselected stream");
                    store.retained.insert(stream_id.clone(), retained);
                }
                continue;
            }
            match store.streams.get_mut(stream_id) {
                Some(StreamCursor::Incremental { key, watermark }) => {
                    match bookmark.get(key.as_str()) {
                        Some(value) => *watermark = Some(Watermark::parse(value)?),
                        None => warn!(
                            stream = %stream_id,
                            replication_key = %key,
                            "Dropping bookmark keyed by a different replication key"
                        ),
                    }
                }
                Some(StreamCursor::FullTable) => {
                    warn!(stream = %stream_id, "Dropping bookmark of FULL_TABLE stream");
                }
                None => {}
            }
        }

        if let Some(current) = &state.current_stream {
            store.set_current_stream(Some(current.clone()))?;
        }

        Ok(store)
    }

    /// Register a stream according to its replication policy
    pub fn register(&mut self, stream: &StreamConfig) -> Result<()> {
        let cursor = match replication::replication_for(stream)? {
            Replication::Incremental { key } => StreamCursor::Incremental {
                key,
                watermark: None,
            },
            Replication::FullTable => StreamCursor::FullTable,
        };
        self.retained.remove(&stream.id);
        self.streams.insert(stream.id.clone(), cursor);
        Ok(())
    }

    /// Whether a stream is registered
    pub fn is_registered(&self, stream: &str) -> bool {
        self.streams.contains_key(stream)
    }

    /// The slot of a registered stream
    pub fn cursor(&self, stream: &str) -> Result<&StreamCursor> {
        self.streams
            .get(stream)
            .ok_or_else(|| Error::unknown_stream(stream))
    }

    /// Current watermark; `None` for full-table or never-synced streams
    pub fn get(&self, stream: &str) -> Result<Option<Watermark>> {
        match self.cursor(stream)? {
            StreamCursor::Incremental { watermark, .. } => Ok(*watermark),
            StreamCursor::FullTable => Ok(None),
        }
    }

    /// Max-merge a candidate into the stream's watermark.
    ///
    /// No-op for full-table streams. Never decreases the watermark.
    pub fn advance(&mut self, stream: &str, candidate: &Watermark) -> Result<()> {
        match self
            .streams
            .get_mut(stream)
            .ok_or_else(|| Error::unknown_stream(stream))?
        {
            StreamCursor::Incremental { watermark, .. } => {
                *watermark = Some(watermark::max_merge(watermark.as_ref(), candidate));
                Ok(())
            }
            StreamCursor::FullTable => Ok(()),
        }
    }

    /// Unconditionally set (or clear) a watermark, bypassing the max-merge
    pub fn override_watermark(&mut self, stream: &str, value: Option<Watermark>) -> Result<()> {
        match self
            .streams
            .get_mut(stream)
            .ok_or_else(|| Error::unknown_stream(stream))?
        {
            StreamCursor::Incremental { watermark, .. } => {
                *watermark = value;
                Ok(())
            }
            StreamCursor::FullTable => Err(Error::invalid_override(
                stream,
                "FULL_TABLE streams cannot carry a bookmark",
            )),
        }
    }

    /// The interrupted-sync marker
    pub fn current_stream(&self) -> Option<&str> {
        self.current_stream.as_deref()
    }

    /// Set or clear the marker; it must name a registered stream
    pub fn set_current_stream(&mut self, stream: Option<String>) -> Result<()> {
        if let Some(id) = &stream {
            if !self.is_registered(id) {
                return Err(Error::unknown_stream(id));
            }
        }
        self.current_stream = stream;
        Ok(())
    }

    /// Deep point-in-time copy in wire form
    pub fn snapshot(&self) -> SyncState {
        let mut bookmarks = self.retained.clone();
        for (stream, cursor) in &self.streams {
            if let StreamCursor::Incremental {
                key,
                watermark: Some(watermark),
            } = cursor
            {
                let mut bookmark = Bookmark::new();
                bookmark.insert(key.clone(), watermark.to_canonical());
                bookmarks.insert(stream.clone(), bookmark);
            }
        }

        SyncState {
            bookmarks,
            current_stream: self.current_stream.clone(),
        }
    }
}

/// Validate a bookmark of a stream outside the selection.
///
/// Known streams follow the same rules as selected ones: full-table or
/// re-keyed bookmarks are dropped. Every kept value is rewritten in
/// canonical form; a malformed value is fatal.
fn retain_unselected(
    catalog: &Catalog,
    stream_id: &str,
    bookmark: &Bookmark,
) -> Result<Option<Bookmark>> {
    let Some(stream) = catalog.get(stream_id) else {
        return bookmark
            .iter()
            .map(|(key, value)| Ok((key.clone(), Watermark::parse(value)?.to_canonical())))
            .collect::<Result<Bookmark>>()
            .map(Some);
    };

    match replication::replication_for(stream)? {
        Replication::FullTable => {
            warn!(stream = %stream_id, "Dropping bookmark of FULL_TABLE stream");
            Ok(None)
        }
        Replication::Incremental { key } => match bookmark.get(key.as_str()) {
            Some(value) => {
                let mut retained = Bookmark::new();
                retained.insert(key, Watermark::parse(value)?.to_canonical());
                Ok(Some(retained))
            }
            None => {
                warn!(
                    stream = %stream_id,
                    replication_key = %key,
                    "Dropping bookmark keyed by a different replication key"
                );
                Ok(None)
            }
        },
    }
}
