//! Error types for the bookmark engine
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for the bookmark engine
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Watermark Errors
    // ============================================================================
    #[error("Malformed watermark '{value}': {message}")]
    MalformedWatermark { value: String, message: String },

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("Stream '{stream}' is not part of the current selection")]
    UnknownStream { stream: String },

    #[error("Invalid state override for '{stream}': {message}")]
    InvalidOverride { stream: String, message: String },

    #[error("State error: {message}")]
    State { message: String },

    #[error("Failed to persist state after {attempts} attempt(s): {message}")]
    PersistenceFailure { attempts: u32, message: String },

    // ============================================================================
    // Sync Errors
    // ============================================================================
    #[error("Extraction failed for stream '{stream}': {message}")]
    ExtractionFailure { stream: String, message: String },

    #[error("Sync interrupted during stream '{stream}'")]
    Interrupted { stream: String },

    #[error("Output error: {message}")]
    Output { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create a malformed watermark error
    pub fn malformed_watermark(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedWatermark {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Create an unknown stream error
    pub fn unknown_stream(stream: impl Into<String>) -> Self {
        Self::UnknownStream {
            stream: stream.into(),
        }
    }

    /// Create an invalid override error
    pub fn invalid_override(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOverride {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create an extraction failure
    pub fn extraction(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExtractionFailure {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Whether this error must abort the whole sync.
    ///
    /// A malformed replication-key value only stops watermark advancement
    /// for the offending record; everything else leaves the last durable
    /// checkpoint as the resume point.
    pub fn is_fatal_to_sync(&self) -> bool {
        !matches!(self, Error::MalformedWatermark { .. })
    }
}

/// Result type alias for the bookmark engine
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
