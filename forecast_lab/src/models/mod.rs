//! Forecasting models and the factory that builds them from configuration.
//!
//! Models come in two calling conventions that do not share a signature:
//!
//! - **series** models ([`SeriesForecaster`]) fit on the raw training history
//!   and forecast `n` steps past its end, feeding their own forecasts back in;
//! - **features** models ([`FeatureRegressor`]) fit on `(window, target)`
//!   pairs and predict each window independently.
//!
//! [`ModelKind`] carries one or the other so callers dispatch with an explicit
//! `match` instead of guessing from the trait object they hold.

use std::fmt::{self, Debug};

use crate::config::ModelConfig;
use crate::error::{ForecastError, Result};

pub mod arima;
#[cfg(feature = "lstm")]
pub mod lstm;
pub mod mlp;
pub mod ses;

pub use arima::ArimaForecaster;
#[cfg(feature = "lstm")]
pub use lstm::LstmForecaster;
pub use mlp::MlpForecaster;
pub use ses::SesForecaster;

/// Model fitted on a raw sequence and forecast autoregressively
pub trait SeriesForecaster: Debug {
    /// Fit on the full training history, oldest value first
    fn fit_series(&mut self, history: &[f64]) -> Result<()>;

    /// Forecast exactly `steps` values past the end of the fitted history
    fn forecast(&self, steps: usize) -> Result<Vec<f64>>;

    /// Check if the model has been fitted
    fn is_fitted(&self) -> bool;

    /// Descriptive name including the resolved parameters
    fn name(&self) -> String;
}

/// Model fitted on fixed-width feature rows and a scalar target per row
pub trait FeatureRegressor: Debug {
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<()>;

    /// One prediction per input row
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>>;

    fn is_fitted(&self) -> bool;

    fn name(&self) -> String;
}

/// Calling convention of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelMode {
    Series,
    Features,
}

impl fmt::Display for ModelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelMode::Series => write!(f, "series"),
            ModelMode::Features => write!(f, "features"),
        }
    }
}

/// A model tagged with its calling convention
#[derive(Debug)]
pub enum ModelKind {
    Series(Box<dyn SeriesForecaster>),
    Features(Box<dyn FeatureRegressor>),
}

impl ModelKind {
    pub fn mode(&self) -> ModelMode {
        match self {
            ModelKind::Series(_) => ModelMode::Series,
            ModelKind::Features(_) => ModelMode::Features,
        }
    }
}

/// A configured model instance owned by one experiment cell
#[derive(Debug)]
pub struct ModelHandle {
    name: String,
    kind: ModelKind,
}

impl ModelHandle {
    pub fn new(name: impl Into<String>, kind: ModelKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Display label from the configuration
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> ModelMode {
        self.kind.mode()
    }

    pub fn kind(&self) -> &ModelKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut ModelKind {
        &mut self.kind
    }
}

/// Build the adapter named by `config.model_type()`.
///
/// Fails with [`ForecastError::UnsupportedModel`] for unknown tags and with
/// [`ForecastError::MissingDependency`] when the adapter's backend is not
/// compiled in.
pub fn build_model(config: &ModelConfig) -> Result<ModelHandle> {
    let params = config.params();
    let kind = match config.model_type() {
        "ses" => ModelKind::Series(Box::new(SesForecaster::from_params(params)?)),
        "arima" => ModelKind::Series(Box::new(ArimaForecaster::from_params(params)?)),
        "mlp" => ModelKind::Features(Box::new(MlpForecaster::from_params(params)?)),
        "lstm" => ModelKind::Features(build_lstm(config)?),
        _ => {
            return Err(ForecastError::UnsupportedModel(
                config.model_type().to_string(),
            ))
        }
    };
    Ok(ModelHandle::new(config.name(), kind))
}

#[cfg(feature = "lstm")]
fn build_lstm(config: &ModelConfig) -> Result<Box<dyn FeatureRegressor>> {
    Ok(Box::new(LstmForecaster::from_params(config.params())?))
}

#[cfg(not(feature = "lstm"))]
fn build_lstm(config: &ModelConfig) -> Result<Box<dyn FeatureRegressor>> {
    Err(ForecastError::MissingDependency {
        model: config.name().to_string(),
        dependency: "the ndarray backend (enable the `lstm` cargo feature)".to_string(),
    })
}

/// Validate a feature matrix against its targets before fitting.
pub(crate) fn check_training_shape(features: &[Vec<f64>], targets: &[f64]) -> Result<usize> {
    if features.len() != targets.len() {
        return Err(ForecastError::ShapeMismatch {
            expected: features.len(),
            actual: targets.len(),
        });
    }
    if features.is_empty() {
        return Err(ForecastError::InvalidConfig(
            "Cannot fit on an empty training set".to_string(),
        ));
    }
    if targets.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::DataError(
            "Training targets contain NaN or infinite values".to_string(),
        ));
    }
    check_feature_width(features, None)
}

/// Check that every row has the same width (and `expected`, if given).
pub(crate) fn check_feature_width(features: &[Vec<f64>], expected: Option<usize>) -> Result<usize> {
    let width = expected.unwrap_or_else(|| features.first().map(Vec::len).unwrap_or(0));
    if width == 0 {
        return Err(ForecastError::InvalidConfig(
            "Feature rows must not be empty".to_string(),
        ));
    }
    for row in features {
        if row.len() != width {
            return Err(ForecastError::ShapeMismatch {
                expected: width,
                actual: row.len(),
            });
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::DataError(
                "Features contain NaN or infinite values".to_string(),
            ));
        }
    }
    Ok(width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelParams;
    use rstest::rstest;

    fn config(model_type: &str) -> ModelConfig {
        ModelConfig::new(None, model_type, ModelParams::new()).unwrap()
    }

    #[rstest]
    #[case("ses", ModelMode::Series)]
    #[case("SES", ModelMode::Series)]
    #[case("arima", ModelMode::Series)]
    #[case("mlp", ModelMode::Features)]
    fn factory_maps_type_tags_to_modes(#[case] model_type: &str, #[case] mode: ModelMode) {
        let handle = build_model(&config(model_type)).unwrap();
        assert_eq!(handle.mode(), mode);
        assert_eq!(handle.name(), model_type);
    }

    #[test]
    fn unknown_type_is_unsupported() {
        let err = build_model(&config("prophet")).unwrap_err();
        assert!(matches!(err, ForecastError::UnsupportedModel(ref t) if t == "prophet"));
        assert!(!err.is_missing_dependency());
    }

    #[cfg(not(feature = "lstm"))]
    #[test]
    fn lstm_without_backend_is_missing_dependency() {
        let err = build_model(&config("lstm")).unwrap_err();
        assert!(err.is_missing_dependency());
    }

    #[cfg(feature = "lstm")]
    #[test]
    fn lstm_with_backend_is_features_mode() {
        let handle = build_model(&config("lstm")).unwrap();
        assert_eq!(handle.mode(), ModelMode::Features);
    }

    #[test]
    fn invalid_params_fail_construction() {
        let bad = ModelConfig::new(
            None,
            "ses",
            ModelParams::new().with("smoothing_level", 1.5),
        )
        .unwrap();
        assert!(matches!(
            build_model(&bad),
            Err(ForecastError::InvalidConfig(_))
        ));
    }

    #[test]
    fn ragged_features_are_rejected() {
        let features = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            check_training_shape(&features, &[1.0, 2.0]),
            Err(ForecastError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            check_training_shape(&features[..1], &[1.0, 2.0]),
            Err(ForecastError::ShapeMismatch { .. })
        ));
    }
}
