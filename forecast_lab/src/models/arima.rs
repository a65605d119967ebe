//! Seasonal ARIMA models for time series forecasting
//!
//! The series is differenced `d` times at lag 1 and `D` times at the seasonal
//! period, then an ARMA model with additive seasonal lags is estimated on the
//! result with the two-stage Hannan-Rissanen regression:
//!
//! 1. a long autoregression gives innovation estimates;
//! 2. the differenced values are regressed on their own lags, the lagged
//!    innovations and the deterministic trend columns.
//!
//! Forecasts run the ARMA recursion forward with future innovations set to
//! zero and are integrated back to the original scale.

use std::iter;

use series_math::{difference_stack, lstsq, Integrator};
use tracing::debug;

use crate::config::ModelParams;
use crate::error::{ForecastError, Result};
use crate::models::SeriesForecaster;

/// Deterministic trend terms on the original (undifferenced) scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    /// No deterministic terms (`"n"`)
    None,
    /// Intercept (`"c"`)
    Constant,
    /// Linear time trend (`"t"`)
    Linear,
    /// Intercept and linear time trend (`"ct"`)
    ConstantLinear,
}

impl Trend {
    pub fn parse(code: &str) -> Result<Self> {
        match code.trim().to_lowercase().as_str() {
            "n" => Ok(Trend::None),
            "c" => Ok(Trend::Constant),
            "t" => Ok(Trend::Linear),
            "ct" => Ok(Trend::ConstantLinear),
            other => Err(ForecastError::InvalidConfig(format!(
                "trend must be one of n, c, t, ct; got '{other}'"
            ))),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Trend::None => "n",
            Trend::Constant => "c",
            Trend::Linear => "t",
            Trend::ConstantLinear => "ct",
        }
    }

    /// Polynomial degrees of the time terms
    fn degrees(&self) -> &'static [usize] {
        match self {
            Trend::None => &[],
            Trend::Constant => &[0],
            Trend::Linear => &[1],
            Trend::ConstantLinear => &[0, 1],
        }
    }
}

/// Non-seasonal `(p, d, q)` order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

/// Seasonal `(P, D, Q, s)` order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub period: usize,
}

impl SeasonalOrder {
    fn is_active(&self) -> bool {
        self.p > 0 || self.d > 0 || self.q > 0
    }
}

#[derive(Debug, Clone)]
struct FittedArima {
    /// One coefficient per degree in `trend_degrees`
    trend_coefs: Vec<f64>,
    /// Degrees of the time polynomial after differencing
    trend_degrees: Vec<usize>,
    ar: Vec<(usize, f64)>,
    ma: Vec<(usize, f64)>,
    differenced: Vec<f64>,
    residuals: Vec<f64>,
    /// Observations consumed by differencing, so time indices keep counting
    /// from the start of the original series
    time_offset: usize,
    integrator: Integrator,
}

impl FittedArima {
    fn time(&self, t: usize) -> f64 {
        (t + self.time_offset + 1) as f64
    }

    /// Conditional one-step prediction of `z[t]` from everything before `t`.
    fn predict_at(&self, t: usize, z: &[f64], e: &[f64]) -> f64 {
        let time = self.time(t);
        let mut value: f64 = self
            .trend_degrees
            .iter()
            .zip(&self.trend_coefs)
            .map(|(&degree, coef)| coef * time.powi(degree as i32))
            .sum();
        for &(lag, phi) in &self.ar {
            if t >= lag {
                value += phi * z[t - lag];
            }
        }
        for &(lag, theta) in &self.ma {
            if t >= lag {
                value += theta * e[t - lag];
            }
        }
        value
    }
}

/// ARIMA(p,d,q)x(P,D,Q,s) forecaster with optional trend
#[derive(Debug, Clone)]
pub struct ArimaForecaster {
    order: ArimaOrder,
    seasonal: SeasonalOrder,
    trend: Trend,
    fitted: Option<FittedArima>,
}

impl ArimaForecaster {
    /// Create a new forecaster.
    ///
    /// `trend` defaults to a constant when the model has no integration and
    /// to no trend otherwise. Trend terms of lower degree than `d + D` are
    /// rejected because differencing removes them.
    pub fn new(order: ArimaOrder, seasonal: SeasonalOrder, trend: Option<Trend>) -> Result<Self> {
        if seasonal.is_active() && seasonal.period < 2 {
            return Err(ForecastError::InvalidConfig(format!(
                "seasonal period must be at least 2, got {}",
                seasonal.period
            )));
        }

        let integration = order.d.checked_add(seasonal.d);
        let span = lag_span(order, seasonal)
            .zip(differencing_span(order, seasonal))
            .and_then(|(lags, consumed)| lags.checked_mul(2)?.checked_add(consumed));
        let Some(integration) = integration.filter(|_| span.is_some()) else {
            return Err(ForecastError::InvalidConfig(format!(
                "orders ({}, {}, {}) x ({}, {}, {}, {}) span more lags than can be indexed",
                order.p, order.d, order.q, seasonal.p, seasonal.d, seasonal.q, seasonal.period
            )));
        };
        let trend = trend.unwrap_or(if integration == 0 {
            Trend::Constant
        } else {
            Trend::None
        });
        if trend.degrees().iter().any(|&degree| degree < integration) {
            return Err(ForecastError::InvalidConfig(format!(
                "trend '{}' has terms removed by {} order(s) of differencing",
                trend.code(),
                integration
            )));
        }

        Ok(Self {
            order,
            seasonal,
            trend,
            fitted: None,
        })
    }

    /// Build from `order`, `seasonal_order` and `trend` parameters.
    pub fn from_params(params: &ModelParams) -> Result<Self> {
        let order = match params.get_usize_list("order")? {
            None => ArimaOrder { p: 2, d: 1, q: 2 },
            Some(values) => match values.as_slice() {
                [p, d, q] => ArimaOrder {
                    p: *p,
                    d: *d,
                    q: *q,
                },
                _ => {
                    return Err(ForecastError::InvalidConfig(format!(
                        "order must have 3 entries (p, d, q), got {}",
                        values.len()
                    )))
                }
            },
        };

        let seasonal = match params.get_usize_list("seasonal_order")? {
            None => SeasonalOrder::default(),
            Some(values) => match values.as_slice() {
                [p, d, q, period] => SeasonalOrder {
                    p: *p,
                    d: *d,
                    q: *q,
                    period: *period,
                },
                _ => {
                    return Err(ForecastError::InvalidConfig(format!(
                        "seasonal_order must have 4 entries (P, D, Q, s), got {}",
                        values.len()
                    )))
                }
            },
        };

        let trend = params.get_str("trend")?.map(Trend::parse).transpose()?;
        Self::new(order, seasonal, trend)
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn seasonal_order(&self) -> SeasonalOrder {
        self.seasonal
    }

    pub fn trend(&self) -> Trend {
        self.trend
    }

    /// Fitted autoregressive coefficients as `(lag, coefficient)` pairs
    pub fn ar_coefficients(&self) -> Option<&[(usize, f64)]> {
        self.fitted.as_ref().map(|f| f.ar.as_slice())
    }

    /// Fitted moving-average coefficients as `(lag, coefficient)` pairs
    pub fn ma_coefficients(&self) -> Option<&[(usize, f64)]> {
        self.fitted.as_ref().map(|f| f.ma.as_slice())
    }

    /// Longest ARMA lag; bounded in `new`.
    fn max_lag(&self) -> usize {
        lag_span(self.order, self.seasonal).unwrap_or(usize::MAX)
    }

    fn differencing_lags(&self) -> Vec<usize> {
        iter::repeat(1)
            .take(self.order.d)
            .chain(iter::repeat(self.seasonal.period).take(self.seasonal.d))
            .collect()
    }

    fn insufficient(&self, observations: usize) -> ForecastError {
        ForecastError::InvalidConfig(format!(
            "Insufficient data for {}: {} observations",
            self.name(),
            observations
        ))
    }
}

fn lag_span(order: ArimaOrder, seasonal: SeasonalOrder) -> Option<usize> {
    let seasonal_span = seasonal.p.max(seasonal.q).checked_mul(seasonal.period)?;
    Some(order.p.max(order.q).max(seasonal_span))
}

fn differencing_span(order: ArimaOrder, seasonal: SeasonalOrder) -> Option<usize> {
    seasonal
        .d
        .checked_mul(seasonal.period)?
        .checked_add(order.d)
}

/// Regular lags `1..=regular` followed by seasonal multiples of `period`.
fn lag_set(regular: usize, seasonal: usize, period: usize) -> Vec<usize> {
    let mut lags: Vec<usize> = (1..=regular)
        .chain((1..=seasonal).map(|k| k * period))
        .collect();
    lags.sort_unstable();
    lags.dedup();
    lags
}

fn time_columns(row: &mut Vec<f64>, degrees: &[usize], time: f64) {
    row.extend(degrees.iter().map(|&degree| time.powi(degree as i32)));
}

/// Innovation estimates from a long autoregression on `z`.
///
/// Positions before the autoregression order have no estimate and stay zero.
/// Returns the residuals and the order used.
fn long_ar_residuals(
    z: &[f64],
    min_order: usize,
    degrees: &[usize],
    time_offset: usize,
) -> Option<(Vec<f64>, usize)> {
    let n = z.len();
    let log_n = (n as f64).ln();
    let preferred = (2 * min_order).max((log_n * log_n).ceil() as usize);
    let cap = n.checked_sub(degrees.len() + 1)? / 2;
    let order = preferred.min(cap);
    if order == 0 {
        return None;
    }

    let mut rows = Vec::with_capacity(n - order);
    let mut targets = Vec::with_capacity(n - order);
    for t in order..n {
        let mut row = Vec::with_capacity(degrees.len() + order);
        time_columns(&mut row, degrees, (t + time_offset + 1) as f64);
        row.extend((1..=order).map(|lag| z[t - lag]));
        rows.push(row);
        targets.push(z[t]);
    }
    let beta = lstsq(&rows, &targets).ok()?;

    let mut residuals = vec![0.0; n];
    for (offset, (row, target)) in rows.iter().zip(&targets).enumerate() {
        let fitted: f64 = row.iter().zip(&beta).map(|(x, b)| x * b).sum();
        residuals[order + offset] = target - fitted;
    }
    Some((residuals, order))
}

impl SeriesForecaster for ArimaForecaster {
    fn fit_series(&mut self, history: &[f64]) -> Result<()> {
        let consumed = differencing_span(self.order, self.seasonal).unwrap_or(usize::MAX);
        if history.len().saturating_sub(consumed) <= self.max_lag().saturating_add(1) {
            return Err(self.insufficient(history.len()));
        }
        let lags = self.differencing_lags();
        if history.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::DataError(
                "ARIMA history contains NaN or infinite values".to_string(),
            ));
        }

        let (z, integrator) = difference_stack(history, &lags)?;
        let n = z.len();
        let time_offset = history.len() - n;
        let integration = self.order.d + self.seasonal.d;
        let trend_degrees: Vec<usize> = self
            .trend
            .degrees()
            .iter()
            .map(|degree| degree - integration)
            .collect();

        let ar_lags = lag_set(self.order.p, self.seasonal.p, self.seasonal.period);
        let ma_lags = lag_set(self.order.q, self.seasonal.q, self.seasonal.period);
        let max_ar = ar_lags.last().copied().unwrap_or(0);
        let max_ma = ma_lags.last().copied().unwrap_or(0);

        let (innovations, start) = if ma_lags.is_empty() {
            (vec![0.0; n], max_ar)
        } else {
            let (residuals, long_order) =
                long_ar_residuals(&z, max_ar.max(max_ma), &trend_degrees, time_offset)
                    .ok_or_else(|| self.insufficient(history.len()))?;
            (residuals, max_ar.max(long_order + max_ma))
        };

        let n_cols = trend_degrees.len() + ar_lags.len() + ma_lags.len();
        if n_cols > 0 && n.saturating_sub(start) <= n_cols {
            return Err(self.insufficient(history.len()));
        }

        let mut rows = Vec::with_capacity(n.saturating_sub(start));
        let mut targets = Vec::with_capacity(n.saturating_sub(start));
        for t in start..n {
            let mut row = Vec::with_capacity(n_cols);
            time_columns(&mut row, &trend_degrees, (t + time_offset + 1) as f64);
            row.extend(ar_lags.iter().map(|lag| z[t - lag]));
            row.extend(ma_lags.iter().map(|lag| innovations[t - lag]));
            rows.push(row);
            targets.push(z[t]);
        }
        let beta = if n_cols == 0 {
            Vec::new()
        } else {
            lstsq(&rows, &targets)?
        };

        let (trend_coefs, rest) = beta.split_at(trend_degrees.len());
        let (ar_coefs, ma_coefs) = rest.split_at(ar_lags.len());
        let mut fitted = FittedArima {
            trend_coefs: trend_coefs.to_vec(),
            trend_degrees,
            ar: ar_lags.iter().copied().zip(ar_coefs.iter().copied()).collect(),
            ma: ma_lags.iter().copied().zip(ma_coefs.iter().copied()).collect(),
            differenced: Vec::new(),
            residuals: Vec::new(),
            time_offset,
            integrator,
        };

        // Conditional residuals under the final coefficients
        let mut residuals = vec![0.0; n];
        for t in max_ar..n {
            residuals[t] = z[t] - fitted.predict_at(t, &z, &residuals);
        }
        if residuals.iter().any(|r| !r.is_finite()) {
            debug!("ARMA recursion diverged, keeping long autoregression innovations");
            residuals = innovations;
        }

        debug!(
            model = %self.name(),
            observations = history.len(),
            ar = ?fitted.ar,
            ma = ?fitted.ma,
            trend = ?fitted.trend_coefs,
            "fitted ARIMA"
        );

        fitted.differenced = z;
        fitted.residuals = residuals;
        self.fitted = Some(fitted);
        Ok(())
    }

    fn forecast(&self, steps: usize) -> Result<Vec<f64>> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| ForecastError::NotFitted(self.name()))?;

        let mut z = fitted.differenced.clone();
        let mut e = fitted.residuals.clone();
        let mut differenced_forecast = Vec::with_capacity(steps);
        for _ in 0..steps {
            let value = fitted.predict_at(z.len(), &z, &e);
            z.push(value);
            e.push(0.0);
            differenced_forecast.push(value);
        }

        Ok(fitted.integrator.integrate(&differenced_forecast))
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn name(&self) -> String {
        let ArimaOrder { p, d, q } = self.order;
        let mut name = format!("ARIMA({p},{d},{q})");
        if self.seasonal.is_active() {
            let SeasonalOrder { p, d, q, period } = self.seasonal;
            name.push_str(&format!("x({p},{d},{q},{period})"));
        }
        if self.trend != Trend::None {
            name.push_str(&format!(" trend={}", self.trend.code()));
        }
        name
    }
}
