//! Tests for engine module

use super::*;
use crate::checkpoint::MemoryStateSink;
use crate::extract::MemoryExtractor;
use crate::output::CollectingOutput;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;

fn wm(value: &str) -> Watermark {
    Watermark::parse(value).unwrap()
}

fn catalog() -> Catalog {
    Catalog::new(vec![
        StreamConfig::incremental("A", "ts"),
        StreamConfig::full_table("F"),
    ])
    .unwrap()
}

fn engine(sink: &MemoryStateSink) -> SyncEngine {
    SyncEngine::new(Checkpointer::new(sink.clone()))
}

/// Output that requests cancellation once `after` records were seen
struct CancelAfter {
    inner: CollectingOutput,
    signal: CancelSignal,
    after: usize,
    seen: usize,
}

#[async_trait]
impl OutputTransport for CancelAfter {
    async fn send(&mut self, message: Message) -> Result<()> {
        if message.is_record() {
            self.seen += 1;
            if self.seen >= self.after {
                self.signal.cancel();
            }
        }
        self.inner.send(message).await
    }
}

/// Output that requests cancellation on the first state checkpoint
struct CancelOnCheckpoint {
    inner: CollectingOutput,
    signal: CancelSignal,
}

#[async_trait]
impl OutputTransport for CancelOnCheckpoint {
    async fn send(&mut self, message: Message) -> Result<()> {
        if message.is_state() {
            self.signal.cancel();
        }
        self.inner.send(message).await
    }
}

// ============================================================================
// Order Resolution Tests
// ============================================================================

#[test]
fn test_resolve_order_without_marker() {
    let order = vec!["A".to_string(), "B".to_string(), "C".to_string()];
    assert_eq!(resolve_order(order.clone(), None), order);
}

#[test]
fn test_resolve_order_rotates_to_marker() {
    let order = vec![
        "A".to_string(),
        "B".to_string(),
        "C".to_string(),
        "D".to_string(),
    ];
    assert_eq!(
        resolve_order(order.clone(), Some("C")),
        vec!["C", "D", "A", "B"]
    );
    assert_eq!(resolve_order(order.clone(), Some("A")), order);
    assert_eq!(resolve_order(order.clone(), Some("Z")), order);
}

// ============================================================================
// Types Tests
// ============================================================================

#[test]
fn test_phase_display() {
    assert_eq!(SyncPhase::Idle.to_string(), "idle");
    assert_eq!(
        SyncPhase::StreamActive("A".to_string()).to_string(),
        "stream_active(A)"
    );
    assert_eq!(SyncPhase::Interrupted.to_string(), "interrupted");
}

#[test]
fn test_cancel_signal_shared() {
    let signal = CancelSignal::new();
    let clone = signal.clone();
    assert!(!signal.is_cancelled());
    clone.cancel();
    assert!(signal.is_cancelled());
}

#[test]
fn test_sync_config_builder() {
    let config = SyncConfig::new().with_start_date(wm("2024-01-01"));
    assert_eq!(config.start_date, Some(wm("2024-01-01")));
    assert_eq!(SyncConfig::default().start_date, None);
}

// ============================================================================
// SyncEngine Tests
// ============================================================================

#[tokio::test]
async fn test_sync_mixed_streams() {
    let sink = MemoryStateSink::new();
    let extractor = MemoryExtractor::new()
        .with_records(
            "A",
            vec![
                json!({"id": 1, "ts": "2024-01-11T00:00:00Z"}),
                json!({"id": 2, "ts": "2024-01-09T00:00:00Z"}),
            ],
        )
        .with_records("F", vec![json!({"id": 1}), json!({"id": 2})]);
    let mut output = CollectingOutput::new();

    let mut engine = engine(&sink);
    let report = engine
        .run(&catalog(), &extractor, &mut output, None)
        .await
        .unwrap();

    assert_eq!(engine.phase(), &SyncPhase::Completed);
    assert_eq!(report.order(), vec!["A", "F"]);
    assert_eq!(report.stream("A").unwrap().watermark, Some(wm("2024-01-11")));
    assert_eq!(report.stream("F").unwrap().watermark, None);
    assert_eq!(report.stats.records_emitted, 4);
    assert_eq!(report.stats.streams_completed, 2);
    // Two stream boundaries plus completion
    assert_eq!(report.stats.checkpoints_written, 3);

    let states = output.states();
    assert_eq!(states.len(), 3);
    assert_eq!(states[0].current_stream.as_deref(), Some("F"));
    assert_eq!(states[1].current_stream, None);
    assert_eq!(
        states[2].get_bookmark("A", "ts"),
        Some("2024-01-11T00:00:00.000000Z")
    );
    assert!(!states[2].bookmarks.contains_key("F"));

    let persisted = Checkpointer::new(sink).read().await.unwrap();
    assert_eq!(&persisted, states[2]);
    assert_eq!(report.final_state, persisted);
}

#[tokio::test]
async fn test_sync_uses_start_date_then_bookmark() {
    let sink = MemoryStateSink::with_state(r#"{"bookmarks":{"A":{"ts":"2024-01-10T00:00:00Z"}}}"#);
    let extractor = MemoryExtractor::new();
    let mut output = CollectingOutput::new();

    let catalog = Catalog::new(vec![
        StreamConfig::incremental("A", "ts"),
        StreamConfig::incremental("B", "ts"),
    ])
    .unwrap();

    engine(&sink)
        .with_config(SyncConfig::new().with_start_date(wm("2024-01-01")))
        .run(&catalog, &extractor, &mut output, None)
        .await
        .unwrap();

    let calls = extractor.calls().await;
    assert_eq!(calls[0].start, Some(wm("2024-01-10")));
    assert_eq!(calls[1].start, Some(wm("2024-01-01")));
}

#[tokio::test]
async fn test_sync_counts_data_quality_issues() {
    let sink = MemoryStateSink::new();
    let extractor = MemoryExtractor::new().with_records(
        "A",
        vec![
            json!({"id": 1, "ts": "2024-01-11T00:00:00Z"}),
            json!({"id": 2}),
            json!({"id": 3, "ts": "not-a-date"}),
            json!({"id": 4, "ts": 42}),
            json!({"id": 5, "ts": ""}),
        ],
    );
    let mut output = CollectingOutput::new();

    let report = engine(&sink)
        .run(&catalog(), &extractor, &mut output, None)
        .await
        .unwrap();

    // Every record is still emitted
    assert_eq!(output.records_for("A").len(), 5);
    assert_eq!(report.stats.records_missing_key, 2);
    assert_eq!(report.stats.malformed_values, 2);
    assert_eq!(report.stream("A").unwrap().watermark, Some(wm("2024-01-11")));
}

#[tokio::test]
async fn test_extraction_failure_preserves_last_checkpoint() {
    let sink = MemoryStateSink::with_state(r#"{"bookmarks":{"A":{"ts":"2024-01-10T00:00:00.000000Z"}}}"#);
    let extractor = MemoryExtractor::new()
        .with_records("A", vec![json!({"ts": "2024-02-01T00:00:00Z"})])
        .fail_stream("A", 1);
    let mut output = CollectingOutput::new();

    let mut engine = engine(&sink);
    let err = engine
        .run(&catalog(), &extractor, &mut output, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ExtractionFailure { .. }));
    assert_eq!(engine.phase(), &SyncPhase::Interrupted);
    assert!(output.states().is_empty());

    let persisted = Checkpointer::new(sink).read().await.unwrap();
    assert_eq!(
        persisted.get_bookmark("A", "ts"),
        Some("2024-01-10T00:00:00.000000Z")
    );
    assert_eq!(persisted.current_stream, None);
}

#[tokio::test]
async fn test_cancellation_finishes_batch_without_transition() {
    let sink = MemoryStateSink::new();
    let extractor = MemoryExtractor::new()
        .with_records(
            "A",
            (1..=4).map(|d| json!({ "ts": format!("2024-01-0{d}T00:00:00Z") })),
        )
        .with_batch_size(2);

    let mut engine = engine(&sink);
    let mut output = CancelAfter {
        inner: CollectingOutput::new(),
        signal: engine.cancel_signal(),
        after: 1,
        seen: 0,
    };

    let err = engine
        .run(&catalog(), &extractor, &mut output, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Interrupted { ref stream } if stream == "A"));
    // The in-flight batch of two completes
    assert_eq!(output.inner.records_for("A").len(), 2);
    assert!(output.inner.states().is_empty());
    assert!(sink.contents().await.is_none());
}

#[tokio::test]
async fn test_cancellation_at_stream_boundary() {
    let sink = MemoryStateSink::new();
    let extractor = MemoryExtractor::new()
        .with_records("A", vec![json!({"ts": "2024-01-05T00:00:00Z"})])
        .with_records("F", vec![json!({"id": 1})]);

    let mut engine = engine(&sink);
    let mut output = CancelOnCheckpoint {
        inner: CollectingOutput::new(),
        signal: engine.cancel_signal(),
    };

    let err = engine
        .run(&catalog(), &extractor, &mut output, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Interrupted { ref stream } if stream == "F"));
    assert_eq!(engine.phase(), &SyncPhase::Interrupted);

    // The next stream is never started
    let calls = extractor.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].stream, "A");
    assert!(output.inner.records_for("F").is_empty());

    // The boundary checkpoint stays the resume point
    assert_eq!(output.inner.states().len(), 1);
    let persisted = Checkpointer::new(sink).read().await.unwrap();
    assert_eq!(persisted.current_stream.as_deref(), Some("F"));
    assert_eq!(
        persisted.get_bookmark("A", "ts"),
        Some("2024-01-05T00:00:00.000000Z")
    );
}

#[tokio::test]
async fn test_engine_runs_once() {
    let sink = MemoryStateSink::new();
    let extractor = MemoryExtractor::new();
    let mut output = CollectingOutput::new();

    let mut engine = engine(&sink);
    engine
        .run(&catalog(), &extractor, &mut output, None)
        .await
        .unwrap();

    let err = engine
        .run(&catalog(), &extractor, &mut output, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::State { .. }));
}

#[tokio::test]
async fn test_override_is_persisted_before_first_stream() {
    let sink = MemoryStateSink::new();
    let extractor = MemoryExtractor::new().fail_stream("A", 0);
    let mut output = CollectingOutput::new();

    let state_override = StateOverride::new().set_bookmark("A", "ts", "2023-12-01T00:00:00Z");
    let result = engine(&sink)
        .run(&catalog(), &extractor, &mut output, Some(&state_override))
        .await;
    assert!(result.is_err());

    let persisted = Checkpointer::new(sink).read().await.unwrap();
    assert_eq!(
        persisted.get_bookmark("A", "ts"),
        Some("2023-12-01T00:00:00.000000Z")
    );
    assert_eq!(output.states().len(), 1);
}
