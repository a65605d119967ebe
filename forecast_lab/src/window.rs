//! Supervised windows over a single ordered series.
//!
//! Window `s` uses `values[s..s + lookback]` as features and the value
//! `horizon` steps after the last feature as its target, so every feature
//! timestamp is strictly earlier than the target timestamp. Windows are
//! emitted in chronological order with stride 1 and are never shuffled.

use chrono::NaiveDateTime;

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};

/// Lagged features, targets and target timestamps for one (series, horizon) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedDataset {
    features: Vec<Vec<f64>>,
    targets: Vec<f64>,
    indices: Vec<NaiveDateTime>,
}

/// Number of windows a series of `len` values yields, or `None` if it yields none.
pub fn window_count(len: usize, lookback: usize, horizon: usize) -> Option<usize> {
    lookback
        .checked_add(horizon)
        .and_then(|need| len.checked_add(1)?.checked_sub(need))
        .filter(|count| *count > 0)
}

/// Build lagged feature/target pairs from `series`.
pub fn make_windowed_dataset(
    series: &TimeSeriesData,
    lookback: usize,
    horizon: usize,
) -> Result<WindowedDataset> {
    if lookback == 0 {
        return Err(ForecastError::InvalidConfig(
            "lookback must be positive".to_string(),
        ));
    }
    if horizon == 0 {
        return Err(ForecastError::InvalidConfig(
            "horizon must be positive".to_string(),
        ));
    }
    let count = window_count(series.len(), lookback, horizon).ok_or_else(|| {
        ForecastError::InvalidConfig(format!(
            "Not enough observations for the requested window configuration \
             ({} values, lookback {lookback}, horizon {horizon})",
            series.len()
        ))
    })?;

    let values = series.values();
    let timestamps = series.timestamps();
    let mut features = Vec::with_capacity(count);
    let mut targets = Vec::with_capacity(count);
    let mut indices = Vec::with_capacity(count);

    for start in 0..count {
        let end = start + lookback;
        let target_pos = end + horizon - 1;
        features.push(values[start..end].to_vec());
        targets.push(values[target_pos]);
        indices.push(timestamps[target_pos]);
    }

    Ok(WindowedDataset {
        features,
        targets,
        indices,
    })
}

impl WindowedDataset {
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Target timestamps, one per window
    pub fn indices(&self) -> &[NaiveDateTime] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Width of every feature row
    pub fn lookback(&self) -> usize {
        self.features.first().map(Vec::len).unwrap_or(0)
    }

    /// Chronological split: the last `test_size` windows form the test set.
    pub fn split(&self, test_size: usize) -> Result<(WindowedDataset, WindowedDataset)> {
        if test_size == 0 {
            return Err(ForecastError::InvalidConfig(
                "test_size must be positive".to_string(),
            ));
        }
        if test_size >= self.len() {
            return Err(ForecastError::InvalidConfig(format!(
                "test_size must be smaller than the dataset size ({} >= {})",
                test_size,
                self.len()
            )));
        }
        let split_at = self.len() - test_size;
        Ok((self.range(0, split_at), self.range(split_at, self.len())))
    }

    fn range(&self, start: usize, end: usize) -> WindowedDataset {
        WindowedDataset {
            features: self.features[start..end].to_vec(),
            targets: self.targets[start..end].to_vec(),
            indices: self.indices[start..end].to_vec(),
        }
    }
}
