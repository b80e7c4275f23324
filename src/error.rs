//! Error types for the ts-stat-tests library.

use thiserror::Error;

/// Result type alias for statistical test operations.
pub type Result<T> = std::result::Result<T, StatTestError>;

/// Errors that can occur while computing diagnostics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatTestError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Input cannot be tested at all (all observations missing, period too small).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Series has zero variance after the requested transformations.
    #[error("degenerate series: {0}")]
    DegenerateSeries(String),

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between inputs.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Missing values detected when not allowed.
    #[error("missing values detected in data")]
    MissingValues,

    /// Computation error (e.g., a model fit that did not converge).
    #[error("computation error: {0}")]
    ComputationError(String),
}
