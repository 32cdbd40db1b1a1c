//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors raised by the counter computation itself
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileError {
    #[error("Invalid profiling data: {0}")]
    InvalidProfilingData(String),
}

/// Errors that can occur while reading profiling data
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to read profiling data: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid profiling data format: {0}")]
    InvalidFormat(String),

    #[error(transparent)]
    InvalidData(#[from] ProfileError),
}

/// Errors that can occur during flamegraph generation
#[derive(Error, Debug)]
pub enum FlamegraphError {
    #[error("No command entries to render")]
    EmptyEntries,

    #[error("Metric '{0}' is not additive and cannot be drawn as a flamegraph")]
    UnsupportedMetric(String),

    #[error("Unknown metric id: {0}")]
    UnknownMetric(i32),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
