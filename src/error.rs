// src/error.rs
use thiserror::Error;

/// Main error type for cost estimation operations.
#[derive(Error, Debug)]
pub enum CostingError {
    /// The training batch cannot be fit (empty, malformed record, or
    /// inconsistent vector length).
    #[error("Invalid training data: {0}")]
    InvalidTrainingData(String),

    /// Predict or update was called before any batch fit.
    #[error("Model has not been trained yet")]
    ModelNotTrained,

    /// A persisted model artifact could not be parsed into the expected shape.
    #[error("Corrupt model state: {0}")]
    CorruptModelState(String),

    /// A feature vector does not match the contract length.
    #[error("Feature vector length mismatch: expected {expected}, got {actual}")]
    FeatureLengthMismatch { expected: usize, actual: usize },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for cost estimation operations.
pub type Result<T> = std::result::Result<T, CostingError>;
