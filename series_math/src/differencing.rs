//! Differencing and integration.
//!
//! A stack of differences is described by its lags, e.g. `[1, 1, 7]` for two
//! regular differences followed by one weekly seasonal difference. Applying the
//! stack records the tail of every intermediate series so forecasts on the
//! differenced scale can be integrated back.

use crate::{MathError, Result};

/// Lag-`lag` difference: `y_t = x_t - x_{t-lag}`.
pub fn difference(data: &[f64], lag: usize) -> Vec<f64> {
    if lag == 0 || data.len() <= lag {
        return Vec::new();
    }
    data[lag..]
        .iter()
        .zip(data.iter())
        .map(|(current, previous)| current - previous)
        .collect()
}

/// Undoes a stack of differences for values that extend the differenced series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Integrator {
    /// `(lag, last lag values of the series before that difference)`, in the
    /// order the differences were applied.
    stages: Vec<(usize, Vec<f64>)>,
}

impl Integrator {
    /// Number of differencing stages recorded
    pub fn depth(&self) -> usize {
        self.stages.len()
    }

    /// Map values continuing the fully differenced series back to the original scale.
    pub fn integrate(&self, values: &[f64]) -> Vec<f64> {
        let mut current = values.to_vec();
        for (lag, tail) in self.stages.iter().rev() {
            let mut extended = tail.clone();
            let mut restored = Vec::with_capacity(current.len());
            for value in &current {
                let level = value + extended[extended.len() - lag];
                extended.push(level);
                restored.push(level);
            }
            current = restored;
        }
        current
    }
}

/// Apply each lag in `lags` in order, returning the differenced series and the
/// [`Integrator`] that reverses it.
pub fn difference_stack(data: &[f64], lags: &[usize]) -> Result<(Vec<f64>, Integrator)> {
    let mut current = data.to_vec();
    let mut stages = Vec::with_capacity(lags.len());

    for &lag in lags {
        if lag == 0 {
            return Err(MathError::InvalidInput(
                "Differencing lag must be positive".to_string(),
            ));
        }
        if current.len() <= lag {
            return Err(MathError::InsufficientData(format!(
                "Cannot difference {} observations at lag {}",
                current.len(),
                lag
            )));
        }
        stages.push((lag, current[current.len() - lag..].to_vec()));
        current = difference(&current, lag);
    }

    Ok((current, Integrator { stages }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn first_difference_of_linear_series_is_constant() {
        let data = [1.0, 3.0, 5.0, 7.0];
        assert_eq!(difference(&data, 1), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn difference_shorter_than_lag_is_empty() {
        assert!(difference(&[1.0, 2.0], 2).is_empty());
    }

    #[rstest]
    #[case(vec![1])]
    #[case(vec![1, 1])]
    #[case(vec![3])]
    #[case(vec![1, 3])]
    fn integration_continues_the_original_series(#[case] lags: Vec<usize>) {
        let data: Vec<f64> = (0..20).map(|i| (i * i) as f64 + (i % 3) as f64).collect();
        let (head, tail) = data.split_at(16);

        let (_, integrator) = difference_stack(head, &lags).unwrap();
        let (full_diff, _) = difference_stack(&data, &lags).unwrap();

        // The last four differenced values correspond to the held-back tail.
        let future = &full_diff[full_diff.len() - tail.len()..];
        let restored = integrator.integrate(future);
        for (a, b) in restored.iter().zip(tail) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn empty_stack_is_identity() {
        let (diffed, integrator) = difference_stack(&[1.0, 2.0], &[]).unwrap();
        assert_eq!(diffed, vec![1.0, 2.0]);
        assert_eq!(integrator.depth(), 0);
        assert_eq!(integrator.integrate(&[4.0]), vec![4.0]);
    }

    #[test]
    fn stack_rejects_short_input() {
        assert!(difference_stack(&[1.0, 2.0], &[2]).is_err());
    }
}
