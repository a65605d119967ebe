//! Experiment configuration records.
//!
//! `HorizonConfig` and `ModelConfig` validate on construction, including when
//! they come out of a YAML or JSON document, so downstream code never sees a
//! zero lookback or an empty model type. `ModelParams` stays dynamically
//! typed; each model adapter coerces the keys it understands.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ForecastError, Result};

/// How far ahead to forecast and how much history each sample looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawHorizonConfig")]
pub struct HorizonConfig {
    steps_ahead: usize,
    lookback: usize,
    test_size: usize,
}

#[derive(Deserialize)]
struct RawHorizonConfig {
    steps_ahead: usize,
    #[serde(default = "default_lookback")]
    lookback: usize,
    #[serde(default = "default_test_size")]
    test_size: usize,
}

fn default_lookback() -> usize {
    30
}

fn default_test_size() -> usize {
    120
}

impl TryFrom<RawHorizonConfig> for HorizonConfig {
    type Error = ForecastError;

    fn try_from(raw: RawHorizonConfig) -> Result<Self> {
        Self::new(raw.steps_ahead, raw.lookback, raw.test_size)
    }
}

impl HorizonConfig {
    /// Create a horizon; every field must be positive.
    pub fn new(steps_ahead: usize, lookback: usize, test_size: usize) -> Result<Self> {
        for (name, value) in [
            ("steps_ahead", steps_ahead),
            ("lookback", lookback),
            ("test_size", test_size),
        ] {
            if value == 0 {
                return Err(ForecastError::InvalidConfig(format!(
                    "{name} must be positive"
                )));
            }
        }
        Ok(Self {
            steps_ahead,
            lookback,
            test_size,
        })
    }

    pub fn steps_ahead(&self) -> usize {
        self.steps_ahead
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn test_size(&self) -> usize {
        self.test_size
    }

    /// Label used in the result table, e.g. `"10d"`.
    pub fn label(&self) -> String {
        format!("{}d", self.steps_ahead)
    }
}

/// Free-form tuning knobs for one model.
///
/// Values stay as JSON values until an adapter asks for a key with one of the
/// typed getters. Missing keys and explicit nulls both read as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelParams(BTreeMap<String, Value>);

impl ModelParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn present(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    fn type_error(key: &str, expected: &str, value: &Value) -> ForecastError {
        ForecastError::InvalidConfig(format!(
            "parameter '{key}' must be {expected}, got {value}"
        ))
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        match self.present(key) {
            None => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| Self::type_error(key, "a number", value)),
        }
    }

    pub fn get_usize(&self, key: &str) -> Result<Option<usize>> {
        match self.present(key) {
            None => Ok(None),
            Some(value) => value_as_usize(value)
                .map(Some)
                .ok_or_else(|| Self::type_error(key, "a non-negative integer", value)),
        }
    }

    pub fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        Ok(self.get_usize(key)?.map(|v| v as u64))
    }

    /// A list of non-negative integers. A bare integer reads as a one-element list.
    pub fn get_usize_list(&self, key: &str) -> Result<Option<Vec<usize>>> {
        let Some(value) = self.present(key) else {
            return Ok(None);
        };
        if let Some(single) = value_as_usize(value) {
            return Ok(Some(vec![single]));
        }
        let items = value
            .as_array()
            .ok_or_else(|| Self::type_error(key, "a list of integers", value))?;
        items
            .iter()
            .map(|item| {
                value_as_usize(item)
                    .ok_or_else(|| Self::type_error(key, "a list of integers", value))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        match self.present(key) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| Self::type_error(key, "a string", value)),
        }
    }
}

fn value_as_usize(value: &Value) -> Option<usize> {
    if let Some(v) = value.as_u64() {
        return usize::try_from(v).ok();
    }
    // YAML and JSON writers sometimes emit `3.0` for integral values.
    value
        .as_f64()
        .filter(|v| *v >= 0.0 && v.fract() == 0.0 && *v <= usize::MAX as f64)
        .map(|v| v as usize)
}

/// Serializable configuration for a forecast model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawModelConfig")]
pub struct ModelConfig {
    name: String,
    #[serde(rename = "type")]
    model_type: String,
    params: ModelParams,
}

#[derive(Deserialize)]
struct RawModelConfig {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    model_type: String,
    #[serde(default)]
    params: ModelParams,
}

impl TryFrom<RawModelConfig> for ModelConfig {
    type Error = ForecastError;

    fn try_from(raw: RawModelConfig) -> Result<Self> {
        Self::new(raw.name.as_deref(), &raw.model_type, raw.params)
    }
}

impl ModelConfig {
    /// Create a model entry. The type tag is lower-cased; an absent or blank
    /// name falls back to the type as written.
    pub fn new(name: Option<&str>, model_type: &str, params: ModelParams) -> Result<Self> {
        let model_type_trimmed = model_type.trim();
        if model_type_trimmed.is_empty() {
            return Err(ForecastError::InvalidConfig(
                "model type must not be empty".to_string(),
            ));
        }
        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => model_type_trimmed.to_string(),
        };
        Ok(Self {
            name,
            model_type: model_type_trimmed.to_lowercase(),
            params,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower-cased lookup key for the model factory
    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }
}

/// Preset horizons used when a configuration names none.
pub fn default_horizons() -> Vec<HorizonConfig> {
    vec![
        HorizonConfig {
            steps_ahead: 1,
            lookback: 30,
            test_size: 90,
        },
        HorizonConfig {
            steps_ahead: 10,
            lookback: 60,
            test_size: 120,
        },
        HorizonConfig {
            steps_ahead: 30,
            lookback: 90,
            test_size: 180,
        },
    ]
}

/// Preset models used when a configuration names none.
pub fn default_models() -> Vec<ModelConfig> {
    let preset = |model_type: &str, params: ModelParams| ModelConfig {
        name: model_type.to_string(),
        model_type: model_type.to_string(),
        params,
    };
    vec![
        preset("ses", ModelParams::new().with("smoothing_level", Value::Null)),
        preset("arima", ModelParams::new().with("order", vec![2, 1, 2])),
        preset("mlp", ModelParams::new().with("hidden_layer_sizes", vec![64, 32])),
    ]
}

/// Controls an experiment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub data_path: PathBuf,
    pub date_column: String,
    pub target_column: String,
    /// Resampling frequency; `None` keeps the observed timestamps.
    pub frequency: Option<String>,
    pub horizons: Vec<HorizonConfig>,
    pub models: Vec<ModelConfig>,
    pub output_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("ETH-USD.csv"),
            date_column: "Date".to_string(),
            target_column: "Close".to_string(),
            frequency: Some("D".to_string()),
            horizons: default_horizons(),
            models: default_models(),
            output_dir: PathBuf::from("artifacts"),
        }
    }
}

impl RunConfig {
    /// Load a YAML (`.yaml`/`.yml`) or JSON (`.json`) document.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        match extension.as_deref() {
            Some("json") => Self::from_json_str(&content),
            Some("yaml") | Some("yml") | None => Self::from_yaml_str(&content),
            Some(other) => Err(ForecastError::ConfigError(format!(
                "Unsupported config format '.{other}' for {}",
                path.display()
            ))),
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let parsed: Option<Self> = serde_yaml::from_str(content)?;
        Ok(parsed.unwrap_or_default().with_fallbacks())
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let parsed: Option<Self> = serde_json::from_str(content)?;
        Ok(parsed.unwrap_or_default().with_fallbacks())
    }

    /// An explicitly empty horizon or model list means "use the presets".
    fn with_fallbacks(mut self) -> Self {
        if self.horizons.is_empty() {
            self.horizons = default_horizons();
        }
        if self.models.is_empty() {
            self.models = default_models();
        }
        self
    }

    /// Pretty JSON rendering of the resolved configuration.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn horizon_rejects_zero_fields() {
        assert!(HorizonConfig::new(0, 30, 10).is_err());
        assert!(HorizonConfig::new(1, 0, 10).is_err());
        assert!(HorizonConfig::new(1, 30, 0).is_err());
        assert_eq!(HorizonConfig::new(10, 30, 5).unwrap().label(), "10d");
    }

    #[test]
    fn horizon_mapping_applies_defaults() {
        let horizon: HorizonConfig = serde_json::from_value(json!({"steps_ahead": 5})).unwrap();
        assert_eq!(horizon, HorizonConfig::new(5, 30, 120).unwrap());
    }

    #[test]
    fn horizon_mapping_requires_steps_ahead() {
        let parsed: std::result::Result<HorizonConfig, _> =
            serde_json::from_value(json!({"lookback": 5}));
        assert!(parsed.is_err());
    }

    #[test]
    fn model_name_defaults_to_type_and_type_is_lowercased() {
        let model: ModelConfig = serde_json::from_value(json!({"type": "ARIMA"})).unwrap();
        assert_eq!(model.name(), "ARIMA");
        assert_eq!(model.model_type(), "arima");
        assert!(model.params().is_empty());

        let named = ModelConfig::new(Some("fast"), "Mlp", ModelParams::new()).unwrap();
        assert_eq!(named.name(), "fast");
        assert_eq!(named.model_type(), "mlp");
    }

    #[test]
    fn params_typed_getters_coerce_known_shapes() {
        let params: ModelParams = serde_json::from_value(json!({
            "order": [1, 1, 0],
            "units": 32,
            "hidden": 16,
            "rate": 0.5,
            "trend": "c",
            "level": null,
        }))
        .unwrap();

        assert_eq!(params.get_usize_list("order").unwrap(), Some(vec![1, 1, 0]));
        assert_eq!(params.get_usize_list("hidden").unwrap(), Some(vec![16]));
        assert_eq!(params.get_usize("units").unwrap(), Some(32));
        assert_eq!(params.get_f64("rate").unwrap(), Some(0.5));
        assert_eq!(params.get_f64("level").unwrap(), None);
        assert_eq!(params.get_str("trend").unwrap(), Some("c"));
        assert_eq!(params.get_f64("missing").unwrap(), None);
    }

    #[test]
    fn params_wrong_type_is_invalid_config() {
        let params = ModelParams::new().with("units", "many");
        let err = params.get_usize("units").unwrap_err();
        assert!(matches!(err, ForecastError::InvalidConfig(_)));
    }

    #[test]
    fn empty_document_uses_defaults() {
        assert_eq!(RunConfig::from_yaml_str("").unwrap(), RunConfig::default());
        assert_eq!(RunConfig::from_json_str("{}").unwrap(), RunConfig::default());
    }

    #[test]
    fn yaml_document_overrides_fields() {
        let yaml = r#"
data_path: prices.csv
target_column: Adj Close
frequency: null
horizons:
  - steps_ahead: 3
    lookback: 12
    test_size: 20
models:
  - type: SES
    params:
      smoothing_level: 0.4
output_dir: out
"#;
        let config = RunConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.data_path, PathBuf::from("prices.csv"));
        assert_eq!(config.date_column, "Date");
        assert_eq!(config.target_column, "Adj Close");
        assert_eq!(config.frequency, None);
        assert_eq!(config.horizons, vec![HorizonConfig::new(3, 12, 20).unwrap()]);
        assert_eq!(config.models.len(), 1);
        assert_eq!(config.models[0].name(), "SES");
        assert_eq!(config.models[0].model_type(), "ses");
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn empty_lists_fall_back_to_presets() {
        let config = RunConfig::from_json_str(r#"{"horizons": [], "models": []}"#).unwrap();
        assert_eq!(config.horizons, default_horizons());
        assert_eq!(config.models, default_models());
    }

    #[test]
    fn invalid_horizon_in_document_is_rejected() {
        let err = RunConfig::from_json_str(r#"{"horizons": [{"steps_ahead": 0}]}"#).unwrap_err();
        assert!(matches!(err, ForecastError::ConfigError(_)));
    }

    #[test]
    fn resolved_config_serializes_to_json() {
        let json = RunConfig::default().to_json_pretty().unwrap();
        assert!(json.contains("\"target_column\": \"Close\""));
        assert!(json.contains("\"type\": \"arima\""));
    }
}
