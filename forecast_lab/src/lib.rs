//! # Forecast Lab
//!
//! Benchmark several forecasting models on one univariate time series across
//! several forecast horizons.
//!
//! ## Features
//!
//! - CSV ingestion with optional resampling to a regular grid
//! - Leakage-free lagged windows with a chronological train/test split
//! - Statistical models fitted on the raw history (exponential smoothing, ARIMA)
//! - Neural regressors fitted on windows (MLP, and an LSTM behind the `lstm` feature)
//! - MAE, RMSE, MAPE and R² per (model, horizon) cell, exported to `metrics.csv`
//!
//! ## Quick Start
//!
//! ```no_run
//! use forecast_lab::{run_experiments, RunConfig};
//!
//! let config = RunConfig::from_file("configs/baseline.yaml")?;
//! let results = run_experiments(&config)?;
//! for record in results.records() {
//!     println!("{} {} {:.4}", record.model, record.horizon, record.rmse);
//! }
//! # Ok::<(), forecast_lab::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod models;
pub mod runner;
pub mod window;

// Re-export commonly used types
pub use crate::config::{HorizonConfig, ModelConfig, ModelParams, RunConfig};
pub use crate::data::{DataLoader, TimeSeriesData};
pub use crate::error::{ForecastError, Result};
pub use crate::metrics::{compute_regression_metrics, RegressionMetrics};
pub use crate::models::{
    build_model, FeatureRegressor, ModelHandle, ModelKind, ModelMode, SeriesForecaster,
};
pub use crate::runner::{run_experiments, run_on_series, MetricsRecord, ResultTable, SkippedCell};
pub use crate::window::{make_windowed_dataset, WindowedDataset};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
