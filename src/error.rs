//! Error types for the forecast_demand crate

use thiserror::Error;

/// Custom error types for the forecast_demand crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A required column is missing or has an unusable dtype
    #[error("Schema error: {0}")]
    Schema(String),

    /// A segment or date range has no rows to work with
    #[error("Data sparsity error: {0}")]
    DataSparsity(String),

    /// Prediction and target arrays could not be aligned
    #[error("Alignment error: {0}")]
    Alignment(String),

    /// Error from model training or prediction
    #[error("Model error: {0}")]
    Model(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from the experiment tracker
    #[error("Tracking error: {0}")]
    Tracking(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    Polars(String),

    /// Error from JSON serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<polars::prelude::PolarsError> for ForecastError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        ForecastError::Polars(err.to_string())
    }
}
