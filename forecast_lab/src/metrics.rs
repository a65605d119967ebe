//! Metrics for evaluating forecast performance

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Guards the percentage error against zero-valued targets.
pub const MAPE_EPSILON: f64 = 1e-8;

/// Pointwise regression errors between held-out targets and predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error, in percent
    pub mape: f64,
    /// Coefficient of determination
    pub r2: f64,
}

/// Compute MAE, RMSE, MAPE and R² for paired sequences.
///
/// MAPE divides by `y_true + 1e-8`, so it is an approximation when targets
/// are close to zero. R² is 1 for a perfect fit of a constant target and 0
/// for any imperfect one.
pub fn compute_regression_metrics(y_true: &[f64], y_pred: &[f64]) -> Result<RegressionMetrics> {
    if y_true.len() != y_pred.len() {
        return Err(ForecastError::ShapeMismatch {
            expected: y_true.len(),
            actual: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(ForecastError::InvalidConfig(
            "Cannot compute metrics on empty sequences".to_string(),
        ));
    }

    let n = y_true.len() as f64;
    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    let mut pct_sum = 0.0;
    for (&actual, &predicted) in y_true.iter().zip(y_pred) {
        let error = actual - predicted;
        abs_sum += error.abs();
        sq_sum += error * error;
        pct_sum += (error / (actual + MAPE_EPSILON)).abs();
    }

    let mean = y_true.iter().sum::<f64>() / n;
    let ss_tot: f64 = y_true.iter().map(|v| (v - mean).powi(2)).sum();
    let r2 = if ss_tot > 0.0 {
        1.0 - sq_sum / ss_tot
    } else if sq_sum == 0.0 {
        1.0
    } else {
        0.0
    };

    Ok(RegressionMetrics {
        mae: abs_sum / n,
        rmse: (sq_sum / n).sqrt(),
        mape: pct_sum / n * 100.0,
        r2,
    })
}

impl std::fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MAE {:.4}  RMSE {:.4}  MAPE {:.4}%  R2 {:.4}",
            self.mae, self.rmse, self.mape, self.r2
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_regression_metrics() {
        let actual = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        let predicted = vec![12.0, 18.0, 33.0, 37.0, 52.0];

        let metrics = compute_regression_metrics(&actual, &predicted).unwrap();
        assert_relative_eq!(metrics.mae, 2.4, epsilon = 1e-9);
        assert_relative_eq!(metrics.rmse, 30.0_f64.sqrt() / 5.0_f64.sqrt(), epsilon = 1e-9);
        // 2/10 + 2/20 + 3/30 + 3/40 + 2/50 = 0.515
        assert_relative_eq!(metrics.mape, 0.515 / 5.0 * 100.0, epsilon = 1e-6);
        // ss_res = 30, ss_tot = 1000
        assert_relative_eq!(metrics.r2, 0.97, epsilon = 1e-9);
    }

    #[test]
    fn perfect_prediction_is_perfect() {
        let y = vec![3.0, -1.0, 7.5, 2.0];
        let metrics = compute_regression_metrics(&y, &y).unwrap();
        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.rmse, 0.0);
        assert_eq!(metrics.mape, 0.0);
        assert_eq!(metrics.r2, 1.0);
    }

    #[test]
    fn zero_target_stays_finite() {
        let metrics = compute_regression_metrics(&[0.0, 1.0], &[0.0, 1.5]).unwrap();
        assert!(metrics.mape.is_finite());
        assert_relative_eq!(metrics.mape, 25.0, epsilon = 1e-6);
    }

    #[test]
    fn constant_target_with_error_has_zero_r2() {
        let metrics = compute_regression_metrics(&[5.0, 5.0], &[4.0, 6.0]).unwrap();
        assert_eq!(metrics.r2, 0.0);
    }

    #[test]
    fn metrics_are_order_sensitive() {
        let y_true = [1.0, 2.0, 3.0];
        let forward = compute_regression_metrics(&y_true, &[1.0, 2.0, 4.0]).unwrap();
        let reversed = compute_regression_metrics(&y_true, &[4.0, 2.0, 1.0]).unwrap();
        assert!(reversed.mae > forward.mae);
    }

    #[test]
    fn length_mismatch_is_shape_error() {
        let err = compute_regression_metrics(&[1.0, 2.0, 3.0], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::ShapeMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(compute_regression_metrics(&[], &[]).is_err());
    }
}
