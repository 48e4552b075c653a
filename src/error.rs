//! Error types for the agent server

use thiserror::Error;

/// Result type alias for agent server operations
pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Error, Debug)]
pub enum ServiceError {

    // =============================
    // Domain Errors
    // =============================

    #[error("Source fetch failed for '{source_name}': {message}")]
    SourceFetch { source_name: String, message: String },

    #[error("Aggregation fault: {0}")]
    AggregationFault(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("No agent available: {0}")]
    NoAgentAvailable(String),

    #[error("Generation failed for agent '{agent}': {message}")]
    Generation { agent: String, message: String },

    #[error("Model runtime error: {0}")]
    Runtime(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
