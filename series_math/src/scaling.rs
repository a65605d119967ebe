//! Standardization for neural regressors.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::{MathError, Result};

/// Zero-mean, unit-variance scaling fitted on a single pool of values.
///
/// A constant pool gets a unit scale so transforms stay finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: f64,
    scale: f64,
}

impl StandardScaler {
    /// Fit mean and population standard deviation over `values`.
    pub fn fit<'a, I>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a f64>,
    {
        let pool: Vec<f64> = values.into_iter().copied().collect();
        if pool.is_empty() {
            return Err(MathError::InsufficientData(
                "Cannot fit a scaler on an empty pool".to_string(),
            ));
        }
        if pool.iter().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Scaler input contains NaN or infinite values".to_string(),
            ));
        }

        let mean = pool.iter().mean();
        let std_dev = pool.iter().population_std_dev();
        let scale = if std_dev.is_finite() && std_dev > 1e-12 {
            std_dev
        } else {
            1.0
        };

        Ok(Self { mean, scale })
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }

    pub fn inverse(&self, value: f64) -> f64 {
        value * self.scale + self.mean
    }

    pub fn transform_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| self.transform(*v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn scaler_round_trips_values() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let scaler = StandardScaler::fit(&values).unwrap();
        assert_relative_eq!(scaler.mean(), 5.0);
        assert_relative_eq!(scaler.scale(), 2.0);
        assert_relative_eq!(scaler.transform(9.0), 2.0);
        assert_relative_eq!(scaler.inverse(-1.5), 2.0);
    }

    #[test]
    fn constant_pool_uses_unit_scale() {
        let scaler = StandardScaler::fit(&[3.0, 3.0, 3.0]).unwrap();
        assert_relative_eq!(scaler.scale(), 1.0);
        assert_relative_eq!(scaler.transform(3.0), 0.0);
    }

    #[test]
    fn empty_pool_is_rejected() {
        let empty: [f64; 0] = [];
        assert!(StandardScaler::fit(&empty).is_err());
    }
}
