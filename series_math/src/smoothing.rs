//! Simple exponential smoothing.
//!
//! `level_t = alpha * x_t + (1 - alpha) * level_{t-1}`, seeded with the first
//! observation. The one-step-ahead forecast of `x_t` is `level_{t-1}`, which
//! is what [`one_step_sse`] scores when estimating `alpha`.

use crate::{MathError, Result};

/// Incremental exponential smoothing state
#[derive(Debug, Clone)]
pub struct ExponentialSmoothing {
    alpha: f64,
    level: Option<f64>,
    values_seen: usize,
}

impl ExponentialSmoothing {
    /// Create a new Exponential Smoothing with the specified alpha (smoothing factor).
    ///
    /// `alpha` may be anywhere in `[0, 1]`: 0 freezes the first observation,
    /// 1 tracks the last one.
    pub fn new(alpha: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(MathError::InvalidInput(format!(
                "Alpha must be between 0 and 1 (inclusive), got {alpha}"
            )));
        }

        Ok(Self {
            alpha,
            level: None,
            values_seen: 0,
        })
    }

    /// Update the smoothed level with a new value
    pub fn update(&mut self, value: f64) {
        self.values_seen += 1;
        self.level = Some(match self.level {
            None => value,
            Some(level) => self.alpha * value + (1.0 - self.alpha) * level,
        });
    }

    /// Feed every value of `data` in order
    pub fn update_all(&mut self, data: &[f64]) {
        for &value in data {
            self.update(value);
        }
    }

    /// Get the current smoothed level
    pub fn level(&self) -> Result<f64> {
        self.level.ok_or_else(|| {
            MathError::InsufficientData("No data available for exponential smoothing".to_string())
        })
    }

    /// Get the current alpha value
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Number of observations absorbed so far
    pub fn values_seen(&self) -> usize {
        self.values_seen
    }
}

/// Sum of squared one-step-ahead errors for a given alpha.
pub fn one_step_sse(data: &[f64], alpha: f64) -> f64 {
    let Some((&first, rest)) = data.split_first() else {
        return 0.0;
    };
    let mut level = first;
    let mut sse = 0.0;
    for &value in rest {
        let error = value - level;
        sse += error * error;
        level = alpha * value + (1.0 - alpha) * level;
    }
    sse
}

const GOLDEN_RATIO_CONJUGATE: f64 = 0.618_033_988_749_894_8;

/// Estimate the smoothing level minimizing one-step-ahead SSE.
///
/// A coarse grid over `0.01..=0.99` brackets the minimum, then golden-section
/// search refines it inside the neighbouring grid cells.
pub fn optimize_smoothing_level(data: &[f64]) -> Result<f64> {
    if data.len() < 2 {
        return Err(MathError::InsufficientData(format!(
            "Need at least 2 observations to estimate a smoothing level, got {}",
            data.len()
        )));
    }
    if data.iter().any(|v| !v.is_finite()) {
        return Err(MathError::InvalidInput(
            "Series contains NaN or infinite values".to_string(),
        ));
    }

    let mut best_alpha = 0.5;
    let mut best_sse = f64::INFINITY;
    for step in 1..100 {
        let alpha = step as f64 / 100.0;
        let sse = one_step_sse(data, alpha);
        if sse < best_sse {
            best_sse = sse;
            best_alpha = alpha;
        }
    }

    let mut lo = (best_alpha - 0.01).max(1e-4);
    let mut hi = (best_alpha + 0.01).min(1.0 - 1e-4);
    let mut x1 = hi - GOLDEN_RATIO_CONJUGATE * (hi - lo);
    let mut x2 = lo + GOLDEN_RATIO_CONJUGATE * (hi - lo);
    let mut f1 = one_step_sse(data, x1);
    let mut f2 = one_step_sse(data, x2);
    for _ in 0..40 {
        if f1 < f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - GOLDEN_RATIO_CONJUGATE * (hi - lo);
            f1 = one_step_sse(data, x1);
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + GOLDEN_RATIO_CONJUGATE * (hi - lo);
            f2 = one_step_sse(data, x2);
        }
    }

    let refined = (lo + hi) / 2.0;
    if one_step_sse(data, refined) <= best_sse {
        Ok(refined)
    } else {
        Ok(best_alpha)
    }
}
