//! Time series data handling.
//!
//! [`DataLoader`] reads a dated CSV with polars, picks one numeric column and
//! produces a [`TimeSeriesData`]: strictly increasing timestamps paired with
//! finite values. Optional resampling puts the series on a regular grid the
//! same way an "as-of-frequency, then time-interpolate" pass would: grid points
//! take the observation recorded exactly at that instant, gaps are filled by
//! time-weighted linear interpolation, trailing gaps carry the last value and
//! leading gaps are dropped.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use polars::prelude::*;

use crate::error::{ForecastError, Result};

/// An ordered univariate series with one timestamp per value.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesData {
    name: String,
    timestamps: Vec<NaiveDateTime>,
    values: Vec<f64>,
}

impl TimeSeriesData {
    /// Create a series; timestamps must be strictly increasing and values finite.
    pub fn new(name: &str, timestamps: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::ShapeMismatch {
                expected: timestamps.len(),
                actual: values.len(),
            });
        }
        if let Some(pos) = timestamps.windows(2).position(|w| w[0] >= w[1]) {
            return Err(ForecastError::DataError(format!(
                "Timestamps must be strictly increasing (violated at position {})",
                pos + 1
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::DataError(
                "Series contains NaN or infinite values".to_string(),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            timestamps,
            values,
        })
    }

    /// Daily series starting at `start`, one value per day.
    pub fn daily(name: &str, start: NaiveDate, values: Vec<f64>) -> Result<Self> {
        let origin = start.and_hms_opt(0, 0, 0).ok_or_else(|| {
            ForecastError::DataError(format!("Invalid start date {start}"))
        })?;
        let timestamps = (0..values.len())
            .map(|i| origin + Duration::days(i as i64))
            .collect();
        Self::new(name, timestamps, values)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Positions `start..end` (clamped to the series length).
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.len());
        let start = start.min(end);
        Self {
            name: self.name.clone(),
            timestamps: self.timestamps[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
        }
    }

    /// Every observation at or before `cutoff`.
    pub fn up_to(&self, cutoff: NaiveDateTime) -> Self {
        let end = self.timestamps.partition_point(|ts| *ts <= cutoff);
        self.slice(0, end)
    }
}

/// Regular sampling grid for resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Minute,
    Hourly,
    Daily,
    Weekly,
}

impl Frequency {
    /// Parse a pandas-style alias (`"D"`, `"H"`, `"W"`, `"min"`), case-insensitive.
    pub fn parse(alias: &str) -> Result<Self> {
        match alias.trim().to_lowercase().as_str() {
            "min" | "t" | "minute" => Ok(Frequency::Minute),
            "h" | "hourly" => Ok(Frequency::Hourly),
            "d" | "daily" => Ok(Frequency::Daily),
            "w" | "weekly" => Ok(Frequency::Weekly),
            other => Err(ForecastError::InvalidConfig(format!(
                "Unsupported resampling frequency: {other}"
            ))),
        }
    }

    pub fn step(&self) -> Duration {
        match self {
            Frequency::Minute => Duration::minutes(1),
            Frequency::Hourly => Duration::hours(1),
            Frequency::Daily => Duration::days(1),
            Frequency::Weekly => Duration::weeks(1),
        }
    }

    /// Latest grid instant at or before `ts`; the grid is anchored at the Unix epoch.
    fn floor(&self, ts: NaiveDateTime) -> NaiveDateTime {
        let step = self.step().num_seconds();
        let secs = ts.and_utc().timestamp();
        let floored = secs - secs.rem_euclid(step);
        DateTime::from_timestamp(floored, 0)
            .map(|dt| dt.naive_utc())
            .unwrap_or(ts)
    }
}

/// Put `(timestamp, value)` observations on a regular grid.
///
/// `observations` must be sorted by timestamp without duplicates; `None`
/// values are gaps to be interpolated.
pub fn resample(
    observations: &[(NaiveDateTime, Option<f64>)],
    frequency: Frequency,
) -> Vec<(NaiveDateTime, f64)> {
    let (Some(first), Some(last)) = (observations.first(), observations.last()) else {
        return Vec::new();
    };

    let step = frequency.step();
    let end = frequency.floor(last.0);
    let mut grid = Vec::new();
    let mut cursor = frequency.floor(first.0);
    let mut obs_idx = 0;
    while cursor <= end {
        while obs_idx < observations.len() && observations[obs_idx].0 < cursor {
            obs_idx += 1;
        }
        let exact = observations
            .get(obs_idx)
            .filter(|(ts, _)| *ts == cursor)
            .and_then(|(_, v)| *v)
            .filter(|v| v.is_finite());
        grid.push((cursor, exact));
        cursor += step;
    }

    interpolate_time(&grid)
}

fn interpolate_time(grid: &[(NaiveDateTime, Option<f64>)]) -> Vec<(NaiveDateTime, f64)> {
    let known: Vec<usize> = grid
        .iter()
        .enumerate()
        .filter_map(|(i, (_, v))| v.map(|_| i))
        .collect();
    let Some(&first_known) = known.first() else {
        return Vec::new();
    };

    let mut filled = Vec::with_capacity(grid.len() - first_known);
    let mut next_known = 0;
    for (i, (ts, value)) in grid.iter().enumerate().skip(first_known) {
        if let Some(v) = value {
            filled.push((*ts, *v));
            continue;
        }
        while next_known < known.len() && known[next_known] < i {
            next_known += 1;
        }
        let prev = known[next_known - 1];
        let (prev_ts, prev_value) = (grid[prev].0, grid[prev].1.unwrap_or_default());
        let interpolated = match known.get(next_known) {
            Some(&next) => {
                let (next_ts, next_value) = (grid[next].0, grid[next].1.unwrap_or_default());
                let span = (next_ts - prev_ts).num_seconds() as f64;
                let offset = (*ts - prev_ts).num_seconds() as f64;
                prev_value + (next_value - prev_value) * offset / span
            }
            None => prev_value,
        };
        filled.push((*ts, interpolated));
    }
    filled
}

/// Parse the date formats found in exported price histories.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Data loader for dated CSV files
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load one column of a CSV file as a time series.
    pub fn from_csv<P: AsRef<Path>>(
        path: P,
        date_column: &str,
        target_column: &str,
        frequency: Option<&str>,
    ) -> Result<TimeSeriesData> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ForecastError::MissingData(format!("Cannot open '{}': {e}", path.display()))
        })?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(&df, date_column, target_column, frequency)
    }

    /// Extract, order and optionally resample one column of a DataFrame.
    pub fn from_dataframe(
        df: &DataFrame,
        date_column: &str,
        target_column: &str,
        frequency: Option<&str>,
    ) -> Result<TimeSeriesData> {
        let frequency = frequency.map(Frequency::parse).transpose()?;
        let columns = df.get_column_names();
        if !columns.iter().any(|c| *c == date_column) {
            return Err(ForecastError::MissingData(format!(
                "CSV must contain a {date_column:?} column"
            )));
        }
        if !columns.iter().any(|c| *c == target_column) {
            return Err(ForecastError::MissingData(format!(
                "Column {target_column:?} not found in dataset"
            )));
        }

        let dates = df.column(date_column)?.cast(&DataType::Utf8)?;
        let targets = df.column(target_column)?.cast(&DataType::Float64)?;

        let mut observations = Vec::with_capacity(df.height());
        for (row, (raw_date, value)) in dates
            .utf8()?
            .into_iter()
            .zip(targets.f64()?.into_iter())
            .enumerate()
        {
            let timestamp = raw_date.and_then(parse_timestamp).ok_or_else(|| {
                ForecastError::MissingData(format!(
                    "Unparseable {date_column:?} value {:?} at row {}",
                    raw_date.unwrap_or(""),
                    row + 1
                ))
            })?;
            observations.push((timestamp, value.filter(|v| v.is_finite())));
        }

        // Stable sort keeps file order among equal timestamps; the last one wins.
        observations.sort_by_key(|(ts, _)| *ts);
        let mut deduped: Vec<(NaiveDateTime, Option<f64>)> = Vec::with_capacity(observations.len());
        for obs in observations {
            match deduped.last_mut() {
                Some(last) if last.0 == obs.0 => *last = obs,
                _ => deduped.push(obs),
            }
        }

        let points: Vec<(NaiveDateTime, f64)> = match frequency {
            Some(freq) => resample(&deduped, freq),
            None => deduped
                .into_iter()
                .filter_map(|(ts, v)| v.map(|v| (ts, v)))
                .collect(),
        };

        let (timestamps, values) = points.into_iter().unzip();
        TimeSeriesData::new(target_column, timestamps, values)
    }
}
