//! Error types for the seedling pattern engine
//!
//! This module provides structured error definitions using thiserror and an
//! anyhow escape hatch for error propagation from callers.

use thiserror::Error;

/// Main error type for seedling operations
#[derive(Error, Debug)]
pub enum SeedlingError {
    /// Fatal configuration error (fail fast at construction/setup time)
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Corpus contract violation (e.g. a token missing a tracked label class)
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// Relational backend operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Search-index backend operation failed
    #[error("Search index error: {0}")]
    Index(#[from] tantivy::TantivyError),

    /// Blob or snapshot (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A worker shard failed during parallel pattern construction
    #[error("Task error: {0}")]
    Task(String),

    /// Invalid operation (e.g. adding an attribute restriction to a wildcard node)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for seedling operations
pub type Result<T> = std::result::Result<T, SeedlingError>;

impl SeedlingError {
    /// Shorthand for a fatal configuration error carrying a message
    pub fn config(msg: impl Into<String>) -> Self {
        SeedlingError::Config(config::ConfigError::Message(msg.into()))
    }
}

/// Convert anyhow::Error to SeedlingError
impl From<anyhow::Error> for SeedlingError {
    fn from(err: anyhow::Error) -> Self {
        SeedlingError::Other(err.to_string())
    }
}
