//! Experiment orchestration over the (horizon x model) matrix
//!
//! Every horizon builds its own windowed dataset and chronological split.
//! Every model then runs as an independent cell on that split:
//!
//! ```text
//! Pending -> Built -> Fitted -> Evaluated -> Recorded
//!        \-> Skipped   (optional backend missing)
//! ```
//!
//! A missing optional backend skips only the affected cell. Any other error
//! aborts the whole run.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Instant;

use polars::prelude::{DataFrame, NamedFrom, Series};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{HorizonConfig, ModelConfig, RunConfig};
use crate::data::{DataLoader, TimeSeriesData};
use crate::error::{ForecastError, Result};
use crate::metrics::compute_regression_metrics;
use crate::models::{build_model, ModelKind};
use crate::window::{make_windowed_dataset, WindowedDataset};

/// File written inside `output_dir`
pub const METRICS_FILE: &str = "metrics.csv";

/// Column order of the metrics table
pub const METRICS_COLUMNS: [&str; 7] = [
    "model",
    "horizon",
    "mae",
    "rmse",
    "mape",
    "r2",
    "runtime_sec",
];

/// One evaluated (model, horizon) cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub model: String,
    pub horizon: String,
    pub mae: f64,
    pub rmse: f64,
    pub mape: f64,
    pub r2: f64,
    /// Wall-clock seconds spent fitting and predicting
    pub runtime_sec: f64,
}

/// A cell that was not evaluated because its model's backend is unavailable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedCell {
    pub model: String,
    pub model_type: String,
    pub horizon: String,
    pub reason: String,
}

/// Lifecycle of one experiment cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Pending,
    Built,
    Fitted,
    Evaluated,
    Recorded,
    Skipped,
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CellState::Pending => "pending",
            CellState::Built => "built",
            CellState::Fitted => "fitted",
            CellState::Evaluated => "evaluated",
            CellState::Recorded => "recorded",
            CellState::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// Terminal state of a cell that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum CellOutcome {
    Recorded(MetricsRecord),
    Skipped(SkippedCell),
}

/// Results of a run, sorted by `(horizon, model)`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    records: Vec<MetricsRecord>,
    skipped: Vec<SkippedCell>,
}

impl ResultTable {
    pub fn records(&self) -> &[MetricsRecord] {
        &self.records
    }

    pub fn skipped(&self) -> &[SkippedCell] {
        &self.skipped
    }

    /// Number of evaluated cells
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, model: &str, horizon: &str) -> Option<&MetricsRecord> {
        self.records
            .iter()
            .find(|r| r.model == model && r.horizon == horizon)
    }

    fn push(&mut self, outcome: CellOutcome) {
        match outcome {
            CellOutcome::Recorded(record) => self.records.push(record),
            CellOutcome::Skipped(cell) => self.skipped.push(cell),
        }
    }

    /// Plain string ordering, so `"10d"` sorts before `"1d"`.
    fn sort(&mut self) {
        self.records.sort_by(|a, b| {
            (a.horizon.as_str(), a.model.as_str()).cmp(&(b.horizon.as_str(), b.model.as_str()))
        });
    }

    /// Tabular view with one column per metric
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let records = &self.records;
        let number = |f: fn(&MetricsRecord) -> f64| records.iter().map(f).collect::<Vec<f64>>();

        let columns = vec![
            Series::new(
                METRICS_COLUMNS[0],
                records.iter().map(|r| r.model.as_str()).collect::<Vec<_>>(),
            ),
            Series::new(
                METRICS_COLUMNS[1],
                records.iter().map(|r| r.horizon.as_str()).collect::<Vec<_>>(),
            ),
            Series::new(METRICS_COLUMNS[2], number(|r| r.mae)),
            Series::new(METRICS_COLUMNS[3], number(|r| r.rmse)),
            Series::new(METRICS_COLUMNS[4], number(|r| r.mape)),
            Series::new(METRICS_COLUMNS[5], number(|r| r.r2)),
            Series::new(METRICS_COLUMNS[6], number(|r| r.runtime_sec)),
        ];
        Ok(DataFrame::new(columns)?)
    }

    /// Write the records as CSV, header included even when there are no rows.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        if self.records.is_empty() {
            writer.write_record(METRICS_COLUMNS)?;
        }
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read records written by [`ResultTable::write_csv`].
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Vec<MetricsRecord>> {
        let mut reader = csv::Reader::from_path(path)?;
        let records = reader
            .deserialize()
            .collect::<std::result::Result<Vec<MetricsRecord>, csv::Error>>()?;
        Ok(records)
    }
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<16} {:>8} {:>14} {:>14} {:>10} {:>10} {:>12}",
            "model", "horizon", "mae", "rmse", "mape", "r2", "runtime_sec"
        )?;
        for r in &self.records {
            writeln!(
                f,
                "{:<16} {:>8} {:>14.4} {:>14.4} {:>10.4} {:>10.4} {:>12.3}",
                r.model, r.horizon, r.mae, r.rmse, r.mape, r.r2, r.runtime_sec
            )?;
        }
        for cell in &self.skipped {
            writeln!(
                f,
                "skipped {} ({}) at {}: {}",
                cell.model, cell.model_type, cell.horizon, cell.reason
            )?;
        }
        Ok(())
    }
}

/// Inputs shared by every model of one horizon
struct HorizonSplit<'a> {
    label: String,
    history: TimeSeriesData,
    train: &'a WindowedDataset,
    test: &'a WindowedDataset,
}

fn transition(state: &mut CellState, next: CellState, model: &str, horizon: &str) {
    debug!(model, horizon, from = %state, to = %next, "cell transition");
    *state = next;
}

fn run_cell(split: &HorizonSplit<'_>, config: &ModelConfig) -> Result<CellOutcome> {
    let model = config.name();
    let horizon = split.label.as_str();
    let mut state = CellState::Pending;

    let mut handle = match build_model(config) {
        Ok(handle) => handle,
        Err(err) if err.is_missing_dependency() => {
            warn!(model, horizon, error = %err, "skipping model");
            transition(&mut state, CellState::Skipped, model, horizon);
            return Ok(CellOutcome::Skipped(SkippedCell {
                model: model.to_string(),
                model_type: config.model_type().to_string(),
                horizon: horizon.to_string(),
                reason: err.to_string(),
            }));
        }
        Err(err) => return Err(err),
    };
    transition(&mut state, CellState::Built, model, horizon);

    let started = Instant::now();
    let predictions = match handle.kind_mut() {
        ModelKind::Series(forecaster) => {
            forecaster.fit_series(split.history.values())?;
            transition(&mut state, CellState::Fitted, model, horizon);
            forecaster.forecast(split.test.len())?
        }
        ModelKind::Features(regressor) => {
            regressor.fit(split.train.features(), split.train.targets())?;
            transition(&mut state, CellState::Fitted, model, horizon);
            regressor.predict(split.test.features())?
        }
    };
    let runtime_sec = started.elapsed().as_secs_f64();

    let metrics = compute_regression_metrics(split.test.targets(), &predictions)?;
    transition(&mut state, CellState::Evaluated, model, horizon);

    info!(
        model,
        horizon,
        mode = %handle.mode(),
        mae = metrics.mae,
        rmse = metrics.rmse,
        runtime_sec,
        "recorded"
    );
    transition(&mut state, CellState::Recorded, model, horizon);

    Ok(CellOutcome::Recorded(MetricsRecord {
        model: model.to_string(),
        horizon: horizon.to_string(),
        mae: metrics.mae,
        rmse: metrics.rmse,
        mape: metrics.mape,
        r2: metrics.r2,
        runtime_sec,
    }))
}

/// Evaluate every model at every horizon on an in-memory series.
pub fn run_on_series(
    series: &TimeSeriesData,
    horizons: &[HorizonConfig],
    models: &[ModelConfig],
) -> Result<ResultTable> {
    let mut table = ResultTable::default();

    for horizon in horizons {
        let label = horizon.label();
        info!(
            horizon = %label,
            lookback = horizon.lookback(),
            test_size = horizon.test_size(),
            "evaluating horizon"
        );

        let dataset = make_windowed_dataset(series, horizon.lookback(), horizon.steps_ahead())?;
        let (train, test) = dataset.split(horizon.test_size())?;
        let cutoff = *train.indices().last().ok_or_else(|| {
            ForecastError::InvalidConfig(format!("No training windows for horizon {label}"))
        })?;
        let split = HorizonSplit {
            label,
            history: series.up_to(cutoff),
            train: &train,
            test: &test,
        };

        for model in models {
            table.push(run_cell(&split, model)?);
        }
    }

    table.sort();
    Ok(table)
}

/// Load the configured series, evaluate the matrix and write
/// `<output_dir>/metrics.csv`.
pub fn run_experiments(config: &RunConfig) -> Result<ResultTable> {
    info!(path = %config.data_path.display(), target = %config.target_column, "loading data");
    let series = DataLoader::from_csv(
        &config.data_path,
        &config.date_column,
        &config.target_column,
        config.frequency.as_deref(),
    )?;
    info!(observations = series.len(), "loaded series");

    let table = run_on_series(&series, &config.horizons, &config.models)?;

    fs::create_dir_all(&config.output_dir)?;
    let path = config.output_dir.join(METRICS_FILE);
    table.write_csv(&path)?;
    info!(
        path = %path.display(),
        rows = table.len(),
        skipped = table.skipped().len(),
        "wrote metrics"
    );

    Ok(table)
}
