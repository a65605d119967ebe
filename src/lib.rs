//! # Forecast Lab workspace
//!
//! Umbrella crate for the workspace members:
//!
//! - [`forecast_lab`]: data loading, windowing, models and the experiment runner
//! - [`series_math`]: differencing, least squares, scaling and smoothing kernels
//!
//! ## Example
//!
//! ```
//! use forecast_lab_workspace::forecast_lab::window::window_count;
//!
//! // Ten observations, three lags, one step ahead
//! assert_eq!(window_count(10, 3, 1), Some(7));
//! assert_eq!(window_count(10, 8, 3), None);
//! ```

pub use forecast_lab;
pub use series_math;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_members_are_reachable() {
        assert_eq!(forecast_lab::NAME, "forecast_lab");
        let scaler = series_math::StandardScaler::fit(&[1.0, 3.0]).unwrap();
        assert_eq!(scaler.mean(), 2.0);
    }
}
