//! Error types for the forecast_lab crate

use polars::prelude::PolarsError;
use series_math::MathError;
use thiserror::Error;

/// Custom error types for the forecast_lab crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Non-positive or infeasible window, horizon, test-size or model parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Absent target column, absent or unparseable date column
    #[error("Missing data: {0}")]
    MissingData(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// A model adapter's backing numerical library was not compiled in
    #[error("Model '{model}' requires {dependency}, which is not available in this build")]
    MissingDependency { model: String, dependency: String },

    /// Forecast or predict called before fitting
    #[error("Model not fitted: {0}")]
    NotFitted(String),

    /// Unrecognized model type tag
    #[error("Unsupported model type: {0}")]
    UnsupportedModel(String),

    /// Paired sequences of different lengths
    #[error("Shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Error from numeric kernels
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Error parsing a configuration document
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error writing CSV output
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

impl ForecastError {
    /// Whether this error only means an optional model backend is unavailable.
    ///
    /// The experiment runner skips the affected cell instead of aborting.
    pub fn is_missing_dependency(&self) -> bool {
        matches!(self, ForecastError::MissingDependency { .. })
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::ConfigError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ForecastError {
    fn from(err: serde_yaml::Error) -> Self {
        ForecastError::ConfigError(err.to_string())
    }
}
