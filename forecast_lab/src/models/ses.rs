//! Simple exponential smoothing
//!
//! Level-only smoothing without trend or seasonality. Every forecast step
//! returns the final smoothed level.

use series_math::{optimize_smoothing_level, ExponentialSmoothing};
use tracing::debug;

use crate::config::ModelParams;
use crate::error::{ForecastError, Result};
use crate::models::SeriesForecaster;

#[derive(Debug, Clone, Copy, PartialEq)]
struct FittedLevel {
    alpha: f64,
    level: f64,
}

/// Simple exponential smoothing with an optional fixed smoothing level
#[derive(Debug, Clone, PartialEq)]
pub struct SesForecaster {
    /// Fixed level, or `None` to estimate it from the history
    smoothing_level: Option<f64>,
    fitted: Option<FittedLevel>,
}

impl SesForecaster {
    /// Create a new forecaster. `smoothing_level` must lie in [0, 1].
    pub fn new(smoothing_level: Option<f64>) -> Result<Self> {
        if let Some(alpha) = smoothing_level {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(ForecastError::InvalidConfig(format!(
                    "smoothing_level must be between 0 and 1, got {alpha}"
                )));
            }
        }
        Ok(Self {
            smoothing_level,
            fitted: None,
        })
    }

    pub fn from_params(params: &ModelParams) -> Result<Self> {
        Self::new(params.get_f64("smoothing_level")?)
    }

    /// Smoothing level used by the last fit
    pub fn fitted_alpha(&self) -> Option<f64> {
        self.fitted.map(|f| f.alpha)
    }

    /// Final smoothed level of the last fit
    pub fn level(&self) -> Option<f64> {
        self.fitted.map(|f| f.level)
    }
}

impl SeriesForecaster for SesForecaster {
    fn fit_series(&mut self, history: &[f64]) -> Result<()> {
        if history.len() < 2 {
            return Err(ForecastError::InvalidConfig(format!(
                "Exponential smoothing needs at least 2 observations, got {}",
                history.len()
            )));
        }

        let alpha = match self.smoothing_level {
            Some(alpha) => alpha,
            None => optimize_smoothing_level(history)?,
        };

        let mut smoother = ExponentialSmoothing::new(alpha)?;
        smoother.update_all(history);
        let level = smoother.level()?;

        debug!(alpha, level, observations = history.len(), "fitted exponential smoothing");
        self.fitted = Some(FittedLevel { alpha, level });
        Ok(())
    }

    fn forecast(&self, steps: usize) -> Result<Vec<f64>> {
        let fitted = self
            .fitted
            .ok_or_else(|| ForecastError::NotFitted(self.name()))?;
        Ok(vec![fitted.level; steps])
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn name(&self) -> String {
        match self.smoothing_level {
            Some(alpha) => format!("SES(alpha={alpha})"),
            None => "SES(alpha=estimated)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn forecast_is_flat_at_final_level() {
        let mut model = SesForecaster::new(Some(0.5)).unwrap();
        model.fit_series(&[1.0, 2.0, 3.0, 4.0]).unwrap();

        // 1.0 -> 1.5 -> 2.25 -> 3.125
        assert_relative_eq!(model.level().unwrap(), 3.125, epsilon = 1e-12);
        let forecast = model.forecast(5).unwrap();
        assert_eq!(forecast.len(), 5);
        assert!(forecast.iter().all(|v| (*v - 3.125).abs() < 1e-12));
    }

    #[test]
    fn estimated_level_tracks_a_random_walk() {
        let history: Vec<f64> = (0..80)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 2.0 + i as f64 * 0.5)
            .collect();
        let mut model = SesForecaster::new(None).unwrap();
        model.fit_series(&history).unwrap();

        let alpha = model.fitted_alpha().unwrap();
        assert!(alpha > 0.5, "trending data should favour recent values, got {alpha}");
        let last = *history.last().unwrap();
        assert!((model.forecast(1).unwrap()[0] - last).abs() < 2.0);
    }

    #[test]
    fn zero_steps_gives_empty_forecast() {
        let mut model = SesForecaster::new(Some(0.3)).unwrap();
        model.fit_series(&[5.0, 6.0]).unwrap();
        assert!(model.forecast(0).unwrap().is_empty());
    }

    #[test]
    fn forecast_before_fit_fails() {
        let model = SesForecaster::new(None).unwrap();
        assert!(!model.is_fitted());
        assert!(matches!(model.forecast(3), Err(ForecastError::NotFitted(_))));
    }

    #[test]
    fn single_observation_is_rejected() {
        let mut model = SesForecaster::new(None).unwrap();
        assert!(matches!(
            model.fit_series(&[1.0]),
            Err(ForecastError::InvalidConfig(_))
        ));
    }

    #[rstest]
    #[case(1.0001)]
    #[case(-0.2)]
    #[case(f64::NAN)]
    fn out_of_range_level_is_rejected(#[case] alpha: f64) {
        assert!(SesForecaster::new(Some(alpha)).is_err());
    }

    #[test]
    fn unit_level_forecasts_last_observation() {
        let params = ModelParams::new().with("smoothing_level", 1.0);
        let mut model = SesForecaster::from_params(&params).unwrap();
        model.fit_series(&[4.0, 9.0, 7.5]).unwrap();
        assert_eq!(model.forecast(3).unwrap(), vec![7.5; 3]);
    }

    #[test]
    fn zero_level_keeps_first_observation() {
        let mut model = SesForecaster::new(Some(0.0)).unwrap();
        model.fit_series(&[4.0, 9.0, 7.5]).unwrap();
        assert_eq!(model.forecast(1).unwrap(), vec![4.0]);
    }

    #[test]
    fn params_null_means_estimate() {
        let params = ModelParams::new().with("smoothing_level", serde_json::Value::Null);
        let model = SesForecaster::from_params(&params).unwrap();
        assert_eq!(model.name(), "SES(alpha=estimated)");
    }
}
