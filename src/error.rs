//! Error types for the rideshare-demand library.

use thiserror::Error;

/// Result type alias for demand pipeline operations.
pub type Result<T> = std::result::Result<T, DemandError>;

/// Errors that can occur while building features, fitting or predicting.
#[derive(Error, Debug)]
pub enum DemandError {
    /// A trip record or single value is malformed (bad timestamp, coordinate, field).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A fitted component was used before `fit` was called.
    #[error("{0} must be fitted before use")]
    NotFitted(&'static str),

    /// A feature row or input table does not match the expected schema.
    #[error("schema mismatch for {row}: {detail}")]
    SchemaMismatch { row: String, detail: String },

    /// Not enough history precedes a bucket to build its lag window.
    #[error("insufficient history for region {region} at {bucket}: need {needed} prior buckets")]
    InsufficientHistory {
        region: usize,
        bucket: String,
        needed: usize,
    },

    /// Input data is empty.
    #[error("empty input data: {0}")]
    EmptyData(String),

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error reading or writing a file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// CSV reader error.
    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    /// Artifact (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
