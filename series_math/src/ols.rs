//! Ordinary least squares for small regression problems.
//!
//! The ARIMA adapter solves two regressions per fit (a long autoregression and
//! the final lag regression). Both have a handful of columns and up to a few
//! thousand rows, so a dense SVD is plenty fast and stays well behaved when
//! lag columns are nearly collinear.

use nalgebra::{DMatrix, DVector};

use crate::{MathError, Result};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Least squares over row-major design rows.
///
/// Every row must have the same width and there must be at least as many rows
/// as columns.
pub fn lstsq(rows: &[Vec<f64>], y: &[f64]) -> Result<Vec<f64>> {
    if rows.len() != y.len() {
        return Err(MathError::InvalidInput(format!(
            "Design has {} rows but target has {} values",
            rows.len(),
            y.len()
        )));
    }
    let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);
    if n_cols == 0 {
        return Ok(Vec::new());
    }
    if rows.len() < n_cols {
        return Err(MathError::InsufficientData(format!(
            "Need at least {} rows to estimate {} coefficients, got {}",
            n_cols,
            n_cols,
            rows.len()
        )));
    }
    if rows.iter().any(|r| r.len() != n_cols) {
        return Err(MathError::InvalidInput(
            "Design rows have inconsistent widths".to_string(),
        ));
    }

    let x = DMatrix::from_fn(rows.len(), n_cols, |i, j| rows[i][j]);
    let y = DVector::from_column_slice(y);

    solve_least_squares(&x, &y)
        .map(|beta| beta.iter().copied().collect())
        .ok_or_else(|| {
            MathError::CalculationError("Least squares system is ill-conditioned".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn lstsq_recovers_ar_coefficient() {
        // x_t = 0.5 x_{t-1}, starting at 64
        let mut series = vec![64.0];
        for _ in 0..6 {
            let last = *series.last().unwrap();
            series.push(0.5 * last);
        }
        let rows: Vec<Vec<f64>> = series[..series.len() - 1].iter().map(|v| vec![*v]).collect();
        let beta = lstsq(&rows, &series[1..]).unwrap();
        assert!((beta[0] - 0.5).abs() < 1e-10);
    }

    #[test]
    fn lstsq_rejects_underdetermined_design() {
        let rows = vec![vec![1.0, 2.0, 3.0]];
        let err = lstsq(&rows, &[1.0]).unwrap_err();
        assert!(matches!(err, MathError::InsufficientData(_)));
    }

    #[test]
    fn lstsq_rejects_length_mismatch() {
        let rows = vec![vec![1.0], vec![2.0]];
        assert!(lstsq(&rows, &[1.0]).is_err());
    }
}
