//! Output module
//!
//! Downstream transport for emitted records and state checkpoints.
//!
//! # Overview
//!
//! The output module provides:
//! - `Message` - Record upserts and state checkpoints
//! - `OutputTransport` - Sink for messages
//! - `JsonLinesOutput` - One JSON message per line on any writer
//! - `CollectingOutput` - Keeps messages in memory

mod types;

pub use types::Message;

use crate::error::{Error, Result};
use crate::state::SyncState;
use crate::types::Record;
use async_trait::async_trait;
use std::io::Write;

/// Receives every emitted record and every persisted state snapshot
#[async_trait]
pub trait OutputTransport: Send {
    /// Deliver one message
    async fn send(&mut self, message: Message) -> Result<()>;
}

// ============================================================================
// JSON Lines
// ============================================================================

/// Writes one JSON message per line
pub struct JsonLinesOutput<W: Write + Send> {
    writer: W,
    pretty: bool,
}

impl<W: Write + Send> JsonLinesOutput<W> {
    /// Create a compact JSON lines output
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            pretty: false,
        }
    }

    /// Pretty-print each message
    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Write an arbitrary JSON value as one message
    pub fn write_value(&mut self, value: &serde_json::Value) -> Result<()> {
        let line = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        writeln!(self.writer, "{line}")
            .and_then(|()| self.writer.flush())
            .map_err(|e| Error::output(format!("Failed to write message: {e}")))
    }

    /// Consume the output, returning the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesOutput<std::io::Stdout> {
    /// Output to stdout
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

#[async_trait]
impl<W: Write + Send> OutputTransport for JsonLinesOutput<W> {
    async fn send(&mut self, message: Message) -> Result<()> {
        self.write_value(&message.to_json())
    }
}

// ============================================================================
// Collecting
// ============================================================================

/// Keeps every message in memory
#[derive(Debug, Clone, Default)]
pub struct CollectingOutput {
    /// Messages in emission order
    pub messages: Vec<Message>,
}

impl CollectingOutput {
    /// Create an empty output
    pub fn new() -> Self {
        Self::default()
    }

    /// Records emitted for a stream
    pub fn records_for(&self, stream: &str) -> Vec<&Record> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Record {
                    stream: s, data, ..
                } if s == stream => Some(data),
                _ => None,
            })
            .collect()
    }

    /// Streams in the order their first record appeared
    pub fn stream_order(&self) -> Vec<String> {
        let mut order: Vec<String> = Vec::new();
        for message in &self.messages {
            if let Message::Record { stream, .. } = message {
                if !order.contains(stream) {
                    order.push(stream.clone());
                }
            }
        }
        order
    }

    /// Every state checkpoint, in order
    pub fn states(&self) -> Vec<&SyncState> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::State(state) => Some(state),
                Message::Record { .. } => None,
            })
            .collect()
    }

    /// The last state checkpoint
    pub fn last_state(&self) -> Option<&SyncState> {
        self.states().into_iter().last()
    }
}

#[async_trait]
impl OutputTransport for CollectingOutput {
    async fn send(&mut self, message: Message) -> Result<()> {
        self.messages.push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_message_kinds() {
        let msg = Message::record("A", record(json!({"id": 1})));
        assert!(msg.is_record());
        assert!(!msg.is_state());

        let msg = Message::state(SyncState::new());
        assert!(msg.is_state());
        assert!(!msg.is_record());
    }

    #[test]
    fn test_message_wire_form() {
        let value = Message::record("A", record(json!({"id": 1}))).to_json();
        assert_eq!(value["type"], "RECORD");
        assert_eq!(value["record"]["stream"], "A");
        assert_eq!(value["record"]["action"], "upsert");
        assert_eq!(value["record"]["data"]["id"], 1);

        let mut state = SyncState::new();
        state.current_stream = Some("B".to_string());
        let value = Message::state(state).to_json();
        assert_eq!(value["type"], "STATE");
        assert_eq!(value["state"]["current_stream"], "B");
    }

    #[tokio::test]
    async fn test_json_lines_output() {
        let mut output = JsonLinesOutput::new(Vec::new());
        output
            .send(Message::record("A", record(json!({"id": 1}))))
            .await
            .unwrap();
        output.send(Message::state(SyncState::new())).await.unwrap();

        let text = String::from_utf8(output.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains(r#""type":"STATE""#));
    }

    #[tokio::test]
    async fn test_collecting_output() {
        let mut output = CollectingOutput::new();
        output
            .send(Message::record("B", record(json!({"id": 1}))))
            .await
            .unwrap();
        output
            .send(Message::record("A", record(json!({"id": 2}))))
            .await
            .unwrap();
        output
            .send(Message::record("B", record(json!({"id": 3}))))
            .await
            .unwrap();
        output.send(Message::state(SyncState::new())).await.unwrap();

        assert_eq!(output.records_for("B").len(), 2);
        assert_eq!(output.stream_order(), vec!["B", "A"]);
        assert_eq!(output.states().len(), 1);
        assert_eq!(output.last_state(), Some(&SyncState::new()));
    }
}
