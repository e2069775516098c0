//! Error types for Lifestyle Insights
//!
//! Data conditions inside the engine (missing values, short samples, degenerate
//! variance) are never errors; they only exclude a value or a result. These
//! variants cover caller contract violations and ingestion failures.

use thiserror::Error;

/// Errors that can occur during ingestion or analysis
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Failed to parse records: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid binning: {0}")]
    InvalidBinning(String),

    #[error("Unknown factor: {0}")]
    UnknownFactor(String),

    #[error("Unsupported factor for this operation: {0}")]
    UnsupportedFactor(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
