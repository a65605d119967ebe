//! # Series Math
//!
//! Numeric kernels shared by the forecasting adapters in `forecast_lab`.
//! Nothing in here knows about configuration, files or timestamps; every
//! function works on plain `f64` slices.
//!
//! - [`ols`]: SVD-backed least squares on small dense design matrices
//! - [`differencing`]: regular/seasonal differencing and its inverse
//! - [`smoothing`]: simple exponential smoothing recursion and level estimation
//! - [`scaling`]: standardization fitted on training data only

use thiserror::Error;

pub mod differencing;
pub mod ols;
pub mod scaling;
pub mod smoothing;

pub use differencing::{difference, difference_stack, Integrator};
pub use ols::{lstsq, solve_least_squares};
pub use scaling::StandardScaler;
pub use smoothing::{optimize_smoothing_level, ExponentialSmoothing};

/// Errors that can occur in numeric kernels
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numeric kernels
pub type Result<T> = std::result::Result<T, MathError>;
