//! Operator-supplied state overrides
//!
//! An override is a typed partial update merged onto the last persisted
//! state at sync start: it can replace or clear individual stream
//! bookmarks and keep, replace or clear `current_stream`. It is the only
//! way a watermark is allowed to move backwards.

use super::types::{Bookmark, SyncState};
use crate::config::Catalog;
use crate::error::{Error, Result};
use crate::replication::{self, Replication};
use crate::watermark::Watermark;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Partial update applied onto a loaded state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateOverride {
    /// Stream → replacement bookmark; `null` clears the bookmark
    #[serde(default)]
    pub bookmarks: BTreeMap<String, Option<Bookmark>>,

    /// Absent keeps the loaded marker; `null` clears it; a string replaces it
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_stream: Option<Option<String>>,
}

/// Distinguishes an explicit `null` from an absent field
fn deserialize_present<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl StateOverride {
    /// Create an empty override
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an override from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::State {
            message: format!("Failed to parse state override: {e}"),
        })
    }

    /// Replace a stream's bookmark
    #[must_use]
    pub fn set_bookmark(
        mut self,
        stream: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let mut bookmark = Bookmark::new();
        bookmark.insert(key.into(), value.into());
        self.bookmarks.insert(stream.into(), Some(bookmark));
        self
    }

    /// Remove a stream's bookmark
    #[must_use]
    pub fn clear_bookmark(mut self, stream: impl Into<String>) -> Self {
        self.bookmarks.insert(stream.into(), None);
        self
    }

    /// Replace the interrupted-sync marker
    #[must_use]
    pub fn set_current_stream(mut self, stream: impl Into<String>) -> Self {
        self.current_stream = Some(Some(stream.into()));
        self
    }

    /// Clear the interrupted-sync marker
    #[must_use]
    pub fn clear_current_stream(mut self) -> Self {
        self.current_stream = Some(None);
        self
    }

    /// Whether the override changes anything
    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty() && self.current_stream.is_none()
    }

    /// Validate against the selection and merge onto `state`.
    ///
    /// Nothing is written unless every entry validates.
    pub fn apply(&self, state: &mut SyncState, catalog: &Catalog) -> Result<()> {
        let mut resolved = Vec::with_capacity(self.bookmarks.len());
        for (stream_id, bookmark) in &self.bookmarks {
            let stream = catalog
                .get(stream_id)
                .filter(|s| s.selected)
                .ok_or_else(|| Error::unknown_stream(stream_id))?;

            let key = match replication::replication_for(stream)? {
                Replication::Incremental { key } => key,
                Replication::FullTable => {
                    return Err(Error::invalid_override(
                        stream_id,
                        "FULL_TABLE streams cannot carry a bookmark",
                    ))
                }
            };

            let value = match bookmark {
                None => None,
                Some(bookmark) => Some(validate_bookmark(stream_id, &key, bookmark)?),
            };
            resolved.push((stream_id, key, value));
        }

        if let Some(Some(current)) = &self.current_stream {
            if !catalog.is_selected(current) {
                return Err(Error::unknown_stream(current));
            }
        }

        for (stream_id, key, value) in resolved {
            match value {
                Some(watermark) => state.set_bookmark(stream_id, &key, watermark.to_canonical()),
                None => {
                    state.bookmarks.remove(stream_id);
                }
            }
        }
        if let Some(current) = &self.current_stream {
            state.current_stream.clone_from(current);
        }

        Ok(())
    }
}

fn validate_bookmark(stream: &str, key: &str, bookmark: &Bookmark) -> Result<Watermark> {
    if bookmark.len() != 1 {
        return Err(Error::invalid_override(
            stream,
            format!("expected exactly one entry keyed by '{key}'"),
        ));
    }
    let value = bookmark.get(key).ok_or_else(|| {
        Error::invalid_override(stream, format!("bookmark must be keyed by '{key}'"))
    })?;
    Watermark::parse(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamConfig;
    use pretty_assertions::assert_eq;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            StreamConfig::incremental("A", "ts"),
            StreamConfig::incremental("B", "ts"),
            StreamConfig::full_table("F"),
            StreamConfig::incremental("Off", "ts").with_selected(false),
        ])
        .unwrap()
    }

    #[test]
    fn test_parse_distinguishes_null_and_absent() {
        let keep = StateOverride::from_json(r#"{"bookmarks": {}}"#).unwrap();
        assert_eq!(keep.current_stream, None);

        let clear = StateOverride::from_json(r#"{"current_stream": null}"#).unwrap();
        assert_eq!(clear.current_stream, Some(None));

        let set = StateOverride::from_json(r#"{"current_stream": "B"}"#).unwrap();
        assert_eq!(set.current_stream, Some(Some("B".to_string())));

        let clear_a = StateOverride::from_json(r#"{"bookmarks": {"A": null}}"#).unwrap();
        assert_eq!(clear_a.bookmarks.get("A"), Some(&None));
    }

    #[test]
    fn test_apply_allows_regression() {
        let mut state = SyncState::new();
        state.set_bookmark("A", "ts", "2024-01-10T00:00:00.000000Z");
        state.set_bookmark("B", "ts", "2024-01-10T00:00:00.000000Z");

        StateOverride::new()
            .set_bookmark("A", "ts", "2024-01-09T00:00:00-02:00")
            .clear_bookmark("B")
            .set_current_stream("B")
            .apply(&mut state, &catalog())
            .unwrap();

        assert_eq!(
            state.get_bookmark("A", "ts"),
            Some("2024-01-09T02:00:00.000000Z")
        );
        assert!(!state.has_bookmark("B"));
        assert_eq!(state.current_stream.as_deref(), Some("B"));
    }

    #[test]
    fn test_apply_clear_current_stream() {
        let mut state = SyncState {
            current_stream: Some("A".to_string()),
            ..SyncState::default()
        };
        StateOverride::new()
            .clear_current_stream()
            .apply(&mut state, &catalog())
            .unwrap();
        assert!(state.current_stream.is_none());
    }

    #[test]
    fn test_apply_rejects_unknown_and_deselected() {
        let mut state = SyncState::new();
        let err = StateOverride::new()
            .set_bookmark("Nope", "ts", "2024-01-01")
            .apply(&mut state, &catalog())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownStream { .. }));

        let err = StateOverride::new()
            .set_current_stream("Off")
            .apply(&mut state, &catalog())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownStream { .. }));
    }

    #[test]
    fn test_apply_rejects_full_table_and_bad_key() {
        let mut state = SyncState::new();
        let err = StateOverride::new()
            .set_bookmark("F", "ts", "2024-01-01")
            .apply(&mut state, &catalog())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOverride { .. }));

        let err = StateOverride::new()
            .set_bookmark("A", "updated", "2024-01-01")
            .apply(&mut state, &catalog())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOverride { .. }));

        let err = StateOverride::new()
            .set_bookmark("A", "ts", "later")
            .apply(&mut state, &catalog())
            .unwrap_err();
        assert!(matches!(err, Error::MalformedWatermark { .. }));
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let mut state = SyncState::new();
        state.set_bookmark("A", "ts", "2024-01-10T00:00:00.000000Z");
        let before = state.clone();

        let result = StateOverride::new()
            .set_bookmark("A", "ts", "2024-01-01")
            .set_bookmark("Nope", "ts", "2024-01-01")
            .apply(&mut state, &catalog());

        assert!(result.is_err());
        assert_eq!(state, before);
    }
}
