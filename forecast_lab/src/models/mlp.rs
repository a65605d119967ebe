//! Feed-forward neural network regressor
//!
//! Fully connected ReLU hidden layers with a linear output unit, trained on
//! mean squared error plus an L2 penalty with mini-batch Adam. Inputs and
//! targets are standardized with scalers fitted on the training data only.
//! Training stops after `max_iter` epochs or once the epoch loss has failed to
//! improve by `tol` for `n_iter_no_change` consecutive epochs.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};
use series_math::StandardScaler;
use tracing::debug;

use crate::config::ModelParams;
use crate::error::{ForecastError, Result};
use crate::models::{check_feature_width, check_training_shape, FeatureRegressor};

const BETA_1: f64 = 0.9;
const BETA_2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-8;
const MAX_BATCH_SIZE: usize = 200;

/// Training hyper-parameters
#[derive(Debug, Clone, PartialEq)]
pub struct MlpSettings {
    pub hidden_layer_sizes: Vec<usize>,
    pub max_iter: usize,
    pub learning_rate_init: f64,
    /// L2 penalty strength
    pub alpha: f64,
    /// Mini-batch size; `None` means `min(200, n_samples)`
    pub batch_size: Option<usize>,
    pub random_state: u64,
    pub tol: f64,
    pub n_iter_no_change: usize,
}

impl Default for MlpSettings {
    fn default() -> Self {
        Self {
            hidden_layer_sizes: vec![100],
            max_iter: 500,
            learning_rate_init: 1e-3,
            alpha: 1e-4,
            batch_size: None,
            random_state: 42,
            tol: 1e-4,
            n_iter_no_change: 10,
        }
    }
}

impl MlpSettings {
    pub fn from_params(params: &ModelParams) -> Result<Self> {
        let defaults = Self::default();
        let settings = Self {
            hidden_layer_sizes: params
                .get_usize_list("hidden_layer_sizes")?
                .unwrap_or(defaults.hidden_layer_sizes),
            max_iter: params.get_usize("max_iter")?.unwrap_or(defaults.max_iter),
            learning_rate_init: params
                .get_f64("learning_rate_init")?
                .unwrap_or(defaults.learning_rate_init),
            alpha: params.get_f64("alpha")?.unwrap_or(defaults.alpha),
            batch_size: params.get_usize("batch_size")?,
            random_state: params
                .get_u64("random_state")?
                .unwrap_or(defaults.random_state),
            tol: params.get_f64("tol")?.unwrap_or(defaults.tol),
            n_iter_no_change: params
                .get_usize("n_iter_no_change")?
                .unwrap_or(defaults.n_iter_no_change),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.hidden_layer_sizes.is_empty() || self.hidden_layer_sizes.contains(&0) {
            return Err(ForecastError::InvalidConfig(format!(
                "hidden_layer_sizes must be non-empty and positive, got {:?}",
                self.hidden_layer_sizes
            )));
        }
        if self.max_iter == 0 {
            return Err(ForecastError::InvalidConfig(
                "max_iter must be positive".to_string(),
            ));
        }
        if !(self.learning_rate_init > 0.0 && self.learning_rate_init.is_finite()) {
            return Err(ForecastError::InvalidConfig(format!(
                "learning_rate_init must be positive, got {}",
                self.learning_rate_init
            )));
        }
        if !(self.alpha >= 0.0 && self.alpha.is_finite()) {
            return Err(ForecastError::InvalidConfig(format!(
                "alpha must be non-negative, got {}",
                self.alpha
            )));
        }
        if self.batch_size == Some(0) {
            return Err(ForecastError::InvalidConfig(
                "batch_size must be positive".to_string(),
            ));
        }
        if !(self.tol >= 0.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "tol must be non-negative, got {}",
                self.tol
            )));
        }
        if self.n_iter_no_change == 0 {
            return Err(ForecastError::InvalidConfig(
                "n_iter_no_change must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fully connected layer with row-major `n_out x n_in` weights
#[derive(Debug, Clone)]
struct Dense {
    n_in: usize,
    n_out: usize,
    weights: Vec<f64>,
    biases: Vec<f64>,
}

impl Dense {
    /// Glorot-uniform initialization scaled for ReLU
    fn init(n_in: usize, n_out: usize, rng: &mut StdRng) -> Self {
        let bound = (6.0 / (n_in + n_out) as f64).sqrt();
        let dist = Uniform::new(-bound, bound);
        Self {
            n_in,
            n_out,
            weights: (0..n_in * n_out).map(|_| dist.sample(rng)).collect(),
            biases: (0..n_out).map(|_| dist.sample(rng)).collect(),
        }
    }

    fn forward(&self, input: &[f64], relu: bool) -> Vec<f64> {
        (0..self.n_out)
            .map(|o| {
                let row = &self.weights[o * self.n_in..(o + 1) * self.n_in];
                let z = self.biases[o] + row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>();
                if relu {
                    z.max(0.0)
                } else {
                    z
                }
            })
            .collect()
    }

    fn zeros_like(&self) -> Dense {
        Dense {
            n_in: self.n_in,
            n_out: self.n_out,
            weights: vec![0.0; self.weights.len()],
            biases: vec![0.0; self.biases.len()],
        }
    }
}

#[derive(Debug, Clone)]
struct Network {
    layers: Vec<Dense>,
}

impl Network {
    fn init(n_inputs: usize, hidden: &[usize], rng: &mut StdRng) -> Self {
        let mut sizes = Vec::with_capacity(hidden.len() + 2);
        sizes.push(n_inputs);
        sizes.extend_from_slice(hidden);
        sizes.push(1);
        let layers = sizes
            .windows(2)
            .map(|pair| Dense::init(pair[0], pair[1], rng))
            .collect();
        Self { layers }
    }

    /// Activations of every layer, input first
    fn activations(&self, input: &[f64]) -> Vec<Vec<f64>> {
        let last = self.layers.len() - 1;
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input.to_vec());
        for (index, layer) in self.layers.iter().enumerate() {
            let next = layer.forward(&activations[index], index < last);
            activations.push(next);
        }
        activations
    }

    fn predict_one(&self, input: &[f64]) -> f64 {
        self.activations(input)
            .last()
            .and_then(|out| out.first().copied())
            .unwrap_or(0.0)
    }

    fn squared_weight_sum(&self) -> f64 {
        self.layers
            .iter()
            .flat_map(|layer| layer.weights.iter())
            .map(|w| w * w)
            .sum()
    }

    /// Accumulate gradients of `0.5 * (prediction - target)^2` into `grads`,
    /// returning the sample's squared error.
    fn backprop(&self, input: &[f64], target: f64, grads: &mut [Dense]) -> f64 {
        let activations = self.activations(input);
        let prediction = activations[self.layers.len()][0];
        let mut delta = vec![prediction - target];

        for index in (0..self.layers.len()).rev() {
            let layer = &self.layers[index];
            let grad = &mut grads[index];
            let below = &activations[index];
            for (o, d) in delta.iter().enumerate() {
                grad.biases[o] += d;
                let row = &mut grad.weights[o * layer.n_in..(o + 1) * layer.n_in];
                for (g, a) in row.iter_mut().zip(below) {
                    *g += d * a;
                }
            }
            if index > 0 {
                delta = (0..layer.n_in)
                    .map(|i| {
                        if below[i] <= 0.0 {
                            return 0.0;
                        }
                        delta
                            .iter()
                            .enumerate()
                            .map(|(o, d)| layer.weights[o * layer.n_in + i] * d)
                            .sum()
                    })
                    .collect();
            }
        }

        (prediction - target).powi(2)
    }
}

/// First and second moment estimates for every parameter
#[derive(Debug)]
struct Adam {
    learning_rate: f64,
    step: i32,
    first: Vec<Dense>,
    second: Vec<Dense>,
}

impl Adam {
    fn new(network: &Network, learning_rate: f64) -> Self {
        let zeros: Vec<Dense> = network.layers.iter().map(Dense::zeros_like).collect();
        Self {
            learning_rate,
            step: 0,
            first: zeros.clone(),
            second: zeros,
        }
    }

    fn update(&mut self, network: &mut Network, grads: &[Dense]) {
        self.step += 1;
        let rate = self.learning_rate * (1.0 - BETA_2.powi(self.step)).sqrt()
            / (1.0 - BETA_1.powi(self.step));

        let moments = self.first.iter_mut().zip(self.second.iter_mut());
        for ((layer, grad), (m, v)) in network.layers.iter_mut().zip(grads).zip(moments) {
            let params = layer.weights.iter_mut().chain(layer.biases.iter_mut());
            let gradients = grad.weights.iter().chain(grad.biases.iter());
            let firsts = m.weights.iter_mut().chain(m.biases.iter_mut());
            let seconds = v.weights.iter_mut().chain(v.biases.iter_mut());
            for (((param, g), m), v) in params.zip(gradients).zip(firsts).zip(seconds) {
                *m = BETA_1 * *m + (1.0 - BETA_1) * g;
                *v = BETA_2 * *v + (1.0 - BETA_2) * g * g;
                *param -= rate * *m / (v.sqrt() + ADAM_EPSILON);
            }
        }
    }
}

#[derive(Debug, Clone)]
struct FittedMlp {
    network: Network,
    x_scaler: StandardScaler,
    y_scaler: StandardScaler,
    n_features: usize,
    loss_curve: Vec<f64>,
}

/// Multi-layer perceptron regressor over lagged windows
#[derive(Debug, Clone)]
pub struct MlpForecaster {
    settings: MlpSettings,
    fitted: Option<FittedMlp>,
}

impl MlpForecaster {
    pub fn new(settings: MlpSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            fitted: None,
        })
    }

    pub fn from_params(params: &ModelParams) -> Result<Self> {
        Self::new(MlpSettings::from_params(params)?)
    }

    pub fn settings(&self) -> &MlpSettings {
        &self.settings
    }

    /// Mean training loss per epoch of the last fit
    pub fn loss_curve(&self) -> Option<&[f64]> {
        self.fitted.as_ref().map(|f| f.loss_curve.as_slice())
    }
}

impl FeatureRegressor for MlpForecaster {
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<()> {
        let n_features = check_training_shape(features, targets)?;
        let settings = &self.settings;

        let x_scaler = StandardScaler::fit(features.iter().flatten())?;
        let y_scaler = StandardScaler::fit(targets)?;
        let inputs: Vec<Vec<f64>> = features
            .iter()
            .map(|row| x_scaler.transform_all(row))
            .collect();
        let outputs = y_scaler.transform_all(targets);

        let n_samples = inputs.len();
        let batch_size = settings
            .batch_size
            .unwrap_or(MAX_BATCH_SIZE)
            .min(n_samples);

        let mut rng = StdRng::seed_from_u64(settings.random_state);
        let mut network = Network::init(n_features, &settings.hidden_layer_sizes, &mut rng);
        let mut optimizer = Adam::new(&network, settings.learning_rate_init);
        let mut order: Vec<usize> = (0..n_samples).collect();

        let mut loss_curve = Vec::new();
        let mut best_loss = f64::INFINITY;
        let mut no_improvement = 0;

        for epoch in 0..settings.max_iter {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for batch in order.chunks(batch_size) {
                let mut grads: Vec<Dense> =
                    network.layers.iter().map(Dense::zeros_like).collect();
                let mut squared_error = 0.0;
                for &sample in batch {
                    squared_error += network.backprop(&inputs[sample], outputs[sample], &mut grads);
                }

                let scale = batch.len() as f64;
                for (grad, layer) in grads.iter_mut().zip(&network.layers) {
                    for (g, w) in grad.weights.iter_mut().zip(&layer.weights) {
                        *g = (*g + settings.alpha * w) / scale;
                    }
                    for g in grad.biases.iter_mut() {
                        *g /= scale;
                    }
                }

                let batch_loss = squared_error / (2.0 * scale)
                    + 0.5 * settings.alpha * network.squared_weight_sum() / scale;
                epoch_loss += batch_loss * scale;
                optimizer.update(&mut network, &grads);
            }

            let epoch_loss = epoch_loss / n_samples as f64;
            if !epoch_loss.is_finite() {
                return Err(ForecastError::Math(series_math::MathError::CalculationError(
                    format!("MLP training diverged at epoch {}", epoch + 1),
                )));
            }
            loss_curve.push(epoch_loss);

            if epoch_loss > best_loss - settings.tol {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            if epoch_loss < best_loss {
                best_loss = epoch_loss;
            }
            if no_improvement > settings.n_iter_no_change {
                debug!(epoch = epoch + 1, loss = epoch_loss, "MLP training converged");
                break;
            }
        }

        if loss_curve.len() == settings.max_iter {
            debug!(
                max_iter = settings.max_iter,
                "MLP reached the iteration limit before converging"
            );
        }

        self.fitted = Some(FittedMlp {
            network,
            x_scaler,
            y_scaler,
            n_features,
            loss_curve,
        });
        Ok(())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| ForecastError::NotFitted(self.name()))?;
        if features.is_empty() {
            return Ok(Vec::new());
        }
        check_feature_width(features, Some(fitted.n_features))?;

        Ok(features
            .iter()
            .map(|row| {
                let scaled = fitted.x_scaler.transform_all(row);
                fitted.y_scaler.inverse(fitted.network.predict_one(&scaled))
            })
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn name(&self) -> String {
        format!("MLP{:?}", self.settings.hidden_layer_sizes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::compute_regression_metrics;
    use rstest::rstest;
    use serde_json::json;

    fn averaging_problem(samples: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let dist = Uniform::new(0.0, 10.0);
        let features: Vec<Vec<f64>> = (0..samples)
            .map(|_| (0..3).map(|_| dist.sample(&mut rng)).collect())
            .collect();
        let targets = features.iter().map(|row| row.iter().sum::<f64>() / 3.0).collect();
        (features, targets)
    }

    fn small_mlp() -> MlpForecaster {
        MlpForecaster::new(MlpSettings {
            hidden_layer_sizes: vec![16],
            max_iter: 300,
            learning_rate_init: 1e-2,
            ..MlpSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn learns_a_smooth_relation() {
        let (features, targets) = averaging_problem(200, 1);
        let mut model = small_mlp();
        model.fit(&features, &targets).unwrap();

        let predictions = model.predict(&features).unwrap();
        let metrics = compute_regression_metrics(&targets, &predictions).unwrap();
        assert!(metrics.r2 > 0.9, "r2 = {}", metrics.r2);

        let curve = model.loss_curve().unwrap();
        assert!(curve.last().unwrap() < curve.first().unwrap());
    }

    #[test]
    fn same_seed_gives_identical_predictions() {
        let (features, targets) = averaging_problem(60, 2);
        let mut first = small_mlp();
        let mut second = small_mlp();
        first.fit(&features, &targets).unwrap();
        second.fit(&features, &targets).unwrap();
        assert_eq!(
            first.predict(&features).unwrap(),
            second.predict(&features).unwrap()
        );
    }

    #[test]
    fn predict_checks_width() {
        let (features, targets) = averaging_problem(30, 3);
        let mut model = small_mlp();
        model.fit(&features, &targets).unwrap();
        assert!(matches!(
            model.predict(&[vec![1.0, 2.0]]),
            Err(ForecastError::ShapeMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert!(model.predict(&[]).unwrap().is_empty());
    }

    #[test]
    fn predict_before_fit_fails() {
        let model = MlpForecaster::from_params(&ModelParams::new()).unwrap();
        assert!(matches!(
            model.predict(&[vec![1.0]]),
            Err(ForecastError::NotFitted(_))
        ));
    }

    #[test]
    fn params_override_defaults() {
        let params: ModelParams = serde_json::from_value(json!({
            "hidden_layer_sizes": [64, 32],
            "random_state": 7,
            "batch_size": null
        }))
        .unwrap();
        let model = MlpForecaster::from_params(&params).unwrap();
        assert_eq!(model.settings().hidden_layer_sizes, vec![64, 32]);
        assert_eq!(model.settings().random_state, 7);
        assert_eq!(model.settings().max_iter, 500);
        assert_eq!(model.settings().batch_size, None);
    }

    #[rstest]
    #[case(json!({"hidden_layer_sizes": []}))]
    #[case(json!({"hidden_layer_sizes": [8, 0]}))]
    #[case(json!({"learning_rate_init": 0.0}))]
    #[case(json!({"batch_size": 0}))]
    #[case(json!({"max_iter": 0}))]
    #[case(json!({"alpha": -1.0}))]
    fn invalid_settings_are_rejected(#[case] params: serde_json::Value) {
        let params: ModelParams = serde_json::from_value(params).unwrap();
        assert!(matches!(
            MlpForecaster::from_params(&params),
            Err(ForecastError::InvalidConfig(_))
        ));
    }
}
