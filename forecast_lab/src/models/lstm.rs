//! Recurrent regressor over lagged windows
//!
//! Each window is read as a sequence of scalars by two stacked LSTM layers:
//! the first emits its full hidden sequence, which passes through dropout into
//! a second layer with half as many units whose final hidden state feeds a
//! single linear output. Training is mini-batch Adam on mean squared error
//! with backpropagation through time. Batches follow window order and the last
//! `validation_split` fraction of the training windows is only scored.

use ndarray::linalg::general_mat_mul;
use ndarray::{s, Array1, Array2, ArrayViewD, ArrayViewMutD, Axis, Zip};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Bernoulli, Distribution, Uniform};
use series_math::StandardScaler;
use tracing::debug;

use crate::config::ModelParams;
use crate::error::{ForecastError, Result};
use crate::models::{check_feature_width, check_training_shape, FeatureRegressor};

const BETA_1: f64 = 0.9;
const BETA_2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-7;

/// Training hyper-parameters
#[derive(Debug, Clone, PartialEq)]
pub struct LstmSettings {
    /// Units of the first layer; the second has half as many (at least 1)
    pub units: usize,
    pub dropout: f64,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub validation_split: f64,
    pub random_state: u64,
}

impl Default for LstmSettings {
    fn default() -> Self {
        Self {
            units: 64,
            dropout: 0.1,
            epochs: 40,
            batch_size: 32,
            learning_rate: 1e-3,
            validation_split: 0.1,
            random_state: 42,
        }
    }
}

impl LstmSettings {
    pub fn from_params(params: &ModelParams) -> Result<Self> {
        let defaults = Self::default();
        let settings = Self {
            units: params.get_usize("units")?.unwrap_or(defaults.units),
            dropout: params.get_f64("dropout")?.unwrap_or(defaults.dropout),
            epochs: params.get_usize("epochs")?.unwrap_or(defaults.epochs),
            batch_size: params.get_usize("batch_size")?.unwrap_or(defaults.batch_size),
            learning_rate: params
                .get_f64("learning_rate")?
                .unwrap_or(defaults.learning_rate),
            validation_split: params
                .get_f64("validation_split")?
                .unwrap_or(defaults.validation_split),
            random_state: params
                .get_u64("random_state")?
                .unwrap_or(defaults.random_state),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        let positive = [
            ("units", self.units),
            ("epochs", self.epochs),
            ("batch_size", self.batch_size),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ForecastError::InvalidConfig(format!(
                    "{key} must be positive"
                )));
            }
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ForecastError::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(ForecastError::InvalidConfig(format!(
                "validation_split must be in [0, 1), got {}",
                self.validation_split
            )));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ForecastError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }

    fn summary_units(&self) -> usize {
        (self.units / 2).max(1)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Gate activations and states of one time step, kept for the backward pass
#[derive(Debug)]
struct LstmStep {
    x: Array1<f64>,
    h_prev: Array1<f64>,
    c_prev: Array1<f64>,
    input_gate: Array1<f64>,
    forget_gate: Array1<f64>,
    candidate: Array1<f64>,
    output_gate: Array1<f64>,
    c: Array1<f64>,
    h: Array1<f64>,
}

/// Gate weights stacked as `[input, forget, candidate, output]` blocks
#[derive(Debug, Clone)]
struct LstmLayer {
    units: usize,
    kernel: Array2<f64>,
    recurrent: Array2<f64>,
    bias: Array1<f64>,
}

impl LstmLayer {
    fn init(n_in: usize, units: usize, rng: &mut StdRng) -> Self {
        let kernel_bound = (6.0 / (n_in + 4 * units) as f64).sqrt();
        let recurrent_bound = (6.0 / (5 * units) as f64).sqrt();
        let kernel_dist = Uniform::new(-kernel_bound, kernel_bound);
        let recurrent_dist = Uniform::new(-recurrent_bound, recurrent_bound);

        let kernel = Array2::from_shape_fn((4 * units, n_in), |_| kernel_dist.sample(rng));
        let recurrent =
            Array2::from_shape_fn((4 * units, units), |_| recurrent_dist.sample(rng));
        let mut bias: Array1<f64> = Array1::zeros(4 * units);
        bias.slice_mut(s![units..2 * units]).fill(1.0);

        Self {
            units,
            kernel,
            recurrent,
            bias,
        }
    }

    fn zeros_like(&self) -> Self {
        Self {
            units: self.units,
            kernel: Array2::zeros(self.kernel.raw_dim()),
            recurrent: Array2::zeros(self.recurrent.raw_dim()),
            bias: Array1::zeros(self.bias.raw_dim()),
        }
    }

    fn forward(&self, inputs: &[Array1<f64>]) -> Vec<LstmStep> {
        let n = self.units;
        let mut h_prev: Array1<f64> = Array1::zeros(n);
        let mut c_prev: Array1<f64> = Array1::zeros(n);
        let mut steps = Vec::with_capacity(inputs.len());

        for x in inputs {
            let z = self.kernel.dot(x) + self.recurrent.dot(&h_prev) + &self.bias;
            let input_gate = z.slice(s![0..n]).mapv(sigmoid);
            let forget_gate = z.slice(s![n..2 * n]).mapv(sigmoid);
            let candidate = z.slice(s![2 * n..3 * n]).mapv(f64::tanh);
            let output_gate = z.slice(s![3 * n..]).mapv(sigmoid);
            let c = &forget_gate * &c_prev + &input_gate * &candidate;
            let h = &output_gate * &c.mapv(f64::tanh);

            steps.push(LstmStep {
                x: x.clone(),
                h_prev: h_prev.clone(),
                c_prev: c_prev.clone(),
                input_gate,
                forget_gate,
                candidate,
                output_gate,
                c: c.clone(),
                h: h.clone(),
            });
            h_prev = h;
            c_prev = c;
        }
        steps
    }

    /// Backpropagate `dh` (loss gradient w.r.t. each emitted hidden state)
    /// through time, accumulating parameter gradients into `grads` and
    /// returning the gradient w.r.t. each input.
    fn backward(
        &self,
        steps: &[LstmStep],
        dh: &[Array1<f64>],
        grads: &mut LstmLayer,
    ) -> Vec<Array1<f64>> {
        let n = self.units;
        let mut dh_next: Array1<f64> = Array1::zeros(n);
        let mut dc_next: Array1<f64> = Array1::zeros(n);
        let mut dx = vec![Array1::zeros(self.kernel.ncols()); steps.len()];

        for t in (0..steps.len()).rev() {
            let step = &steps[t];
            let dh_t = &dh[t] + &dh_next;
            let tanh_c = step.c.mapv(f64::tanh);

            let d_output = &dh_t * &tanh_c;
            let dc = &dh_t * &step.output_gate * &tanh_c.mapv(|v| 1.0 - v * v) + &dc_next;
            let d_input = &dc * &step.candidate;
            let d_candidate = &dc * &step.input_gate;
            let d_forget = &dc * &step.c_prev;
            dc_next = &dc * &step.forget_gate;

            let mut dz: Array1<f64> = Array1::zeros(4 * n);
            dz.slice_mut(s![0..n])
                .assign(&(&d_input * &step.input_gate.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![n..2 * n])
                .assign(&(&d_forget * &step.forget_gate.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![2 * n..3 * n])
                .assign(&(&d_candidate * &step.candidate.mapv(|v| 1.0 - v * v)));
            dz.slice_mut(s![3 * n..])
                .assign(&(&d_output * &step.output_gate.mapv(|v| v * (1.0 - v))));

            let dz_column = dz.view().insert_axis(Axis(1));
            general_mat_mul(
                1.0,
                &dz_column,
                &step.x.view().insert_axis(Axis(0)),
                1.0,
                &mut grads.kernel,
            );
            general_mat_mul(
                1.0,
                &dz_column,
                &step.h_prev.view().insert_axis(Axis(0)),
                1.0,
                &mut grads.recurrent,
            );
            grads.bias += &dz;

            dx[t] = self.kernel.t().dot(&dz);
            dh_next = self.recurrent.t().dot(&dz);
        }
        dx
    }
}

#[derive(Debug, Clone)]
struct LstmNetwork {
    sequence: LstmLayer,
    summary: LstmLayer,
    head_weights: Array1<f64>,
    head_bias: Array1<f64>,
}

fn sequence_inputs(window: &[f64]) -> Vec<Array1<f64>> {
    window.iter().map(|&v| Array1::from_elem(1, v)).collect()
}

impl LstmNetwork {
    fn init(units: usize, summary_units: usize, rng: &mut StdRng) -> Self {
        let sequence = LstmLayer::init(1, units, rng);
        let summary = LstmLayer::init(units, summary_units, rng);
        let bound = (6.0 / (summary_units + 1) as f64).sqrt();
        let dist = Uniform::new(-bound, bound);
        Self {
            sequence,
            summary,
            head_weights: Array1::from_shape_fn(summary_units, |_| dist.sample(rng)),
            head_bias: Array1::zeros(1),
        }
    }

    fn zeros_like(&self) -> Self {
        Self {
            sequence: self.sequence.zeros_like(),
            summary: self.summary.zeros_like(),
            head_weights: Array1::zeros(self.head_weights.raw_dim()),
            head_bias: Array1::zeros(1),
        }
    }

    fn arrays(&self) -> Vec<ArrayViewD<'_, f64>> {
        vec![
            self.sequence.kernel.view().into_dyn(),
            self.sequence.recurrent.view().into_dyn(),
            self.sequence.bias.view().into_dyn(),
            self.summary.kernel.view().into_dyn(),
            self.summary.recurrent.view().into_dyn(),
            self.summary.bias.view().into_dyn(),
            self.head_weights.view().into_dyn(),
            self.head_bias.view().into_dyn(),
        ]
    }

    fn arrays_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        vec![
            self.sequence.kernel.view_mut().into_dyn(),
            self.sequence.recurrent.view_mut().into_dyn(),
            self.sequence.bias.view_mut().into_dyn(),
            self.summary.kernel.view_mut().into_dyn(),
            self.summary.recurrent.view_mut().into_dyn(),
            self.summary.bias.view_mut().into_dyn(),
            self.head_weights.view_mut().into_dyn(),
            self.head_bias.view_mut().into_dyn(),
        ]
    }

    fn predict(&self, window: &[f64]) -> f64 {
        let first: Vec<Array1<f64>> = self
            .sequence
            .forward(&sequence_inputs(window))
            .into_iter()
            .map(|step| step.h)
            .collect();
        match self.summary.forward(&first).last() {
            Some(step) => self.head_weights.dot(&step.h) + self.head_bias[0],
            None => self.head_bias[0],
        }
    }

    /// Accumulate gradients of the squared error for one window into `grads`.
    ///
    /// `masks` holds one dropout mask per time step of the first layer's
    /// output. Returns the squared error.
    fn accumulate(
        &self,
        window: &[f64],
        target: f64,
        masks: &[Array1<f64>],
        grads: &mut LstmNetwork,
    ) -> f64 {
        let first_steps = self.sequence.forward(&sequence_inputs(window));
        let dropped: Vec<Array1<f64>> = first_steps
            .iter()
            .zip(masks)
            .map(|(step, mask)| &step.h * mask)
            .collect();
        let second_steps = self.summary.forward(&dropped);
        let Some(last) = second_steps.last() else {
            return 0.0;
        };

        let prediction = self.head_weights.dot(&last.h) + self.head_bias[0];
        let d_prediction = 2.0 * (prediction - target);
        grads.head_weights.scaled_add(d_prediction, &last.h);
        grads.head_bias[0] += d_prediction;

        let mut dh_summary = vec![Array1::zeros(self.summary.units); second_steps.len()];
        dh_summary[second_steps.len() - 1] = &self.head_weights * d_prediction;
        let dx_summary = self
            .summary
            .backward(&second_steps, &dh_summary, &mut grads.summary);

        let dh_sequence: Vec<Array1<f64>> = dx_summary
            .iter()
            .zip(masks)
            .map(|(d, mask)| d * mask)
            .collect();
        self.sequence
            .backward(&first_steps, &dh_sequence, &mut grads.sequence);

        (prediction - target).powi(2)
    }
}

#[derive(Debug)]
struct Adam {
    learning_rate: f64,
    step: i32,
    first: LstmNetwork,
    second: LstmNetwork,
}

impl Adam {
    fn new(network: &LstmNetwork, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            step: 0,
            first: network.zeros_like(),
            second: network.zeros_like(),
        }
    }

    fn update(&mut self, network: &mut LstmNetwork, grads: &LstmNetwork) {
        self.step += 1;
        let rate = self.learning_rate * (1.0 - BETA_2.powi(self.step)).sqrt()
            / (1.0 - BETA_1.powi(self.step));

        let params = network.arrays_mut();
        let gradients = grads.arrays();
        let firsts = self.first.arrays_mut();
        let seconds = self.second.arrays_mut();
        for (((mut param, grad), mut m), mut v) in params
            .into_iter()
            .zip(gradients)
            .zip(firsts)
            .zip(seconds)
        {
            Zip::from(&mut param)
                .and(&grad)
                .and(&mut m)
                .and(&mut v)
                .for_each(|p, &g, m, v| {
                    *m = BETA_1 * *m + (1.0 - BETA_1) * g;
                    *v = BETA_2 * *v + (1.0 - BETA_2) * g * g;
                    *p -= rate * *m / (v.sqrt() + ADAM_EPSILON);
                });
        }
    }
}

#[derive(Debug, Clone)]
struct FittedLstm {
    network: LstmNetwork,
    x_scaler: StandardScaler,
    y_scaler: StandardScaler,
    n_features: usize,
    loss_history: Vec<f64>,
}

/// Stacked LSTM regressor
#[derive(Debug, Clone)]
pub struct LstmForecaster {
    settings: LstmSettings,
    fitted: Option<FittedLstm>,
}

impl LstmForecaster {
    pub fn new(settings: LstmSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            fitted: None,
        })
    }

    pub fn from_params(params: &ModelParams) -> Result<Self> {
        Self::new(LstmSettings::from_params(params)?)
    }

    pub fn settings(&self) -> &LstmSettings {
        &self.settings
    }

    /// Mean training loss per epoch of the last fit
    pub fn loss_history(&self) -> Option<&[f64]> {
        self.fitted.as_ref().map(|f| f.loss_history.as_slice())
    }

    fn dropout_masks(
        &self,
        steps: usize,
        dropout: Option<&Bernoulli>,
        rng: &mut StdRng,
    ) -> Vec<Array1<f64>> {
        let units = self.settings.units;
        match dropout {
            None => vec![Array1::ones(units); steps],
            Some(keep) => {
                let scale = 1.0 / (1.0 - self.settings.dropout);
                (0..steps)
                    .map(|_| {
                        Array1::from_shape_fn(units, |_| {
                            if keep.sample(rng) {
                                scale
                            } else {
                                0.0
                            }
                        })
                    })
                    .collect()
            }
        }
    }
}

impl FeatureRegressor for LstmForecaster {
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<()> {
        let n_features = check_training_shape(features, targets)?;
        let settings = self.settings.clone();

        let n_samples = features.len();
        let n_train = (n_samples as f64 * (1.0 - settings.validation_split)) as usize;
        if n_train == 0 {
            return Err(ForecastError::InvalidConfig(format!(
                "validation_split {} leaves no training windows out of {}",
                settings.validation_split, n_samples
            )));
        }

        // Held-out windows do not contribute to the scaling statistics
        let x_scaler = StandardScaler::fit(features[..n_train].iter().flatten())?;
        let y_scaler = StandardScaler::fit(&targets[..n_train])?;
        let inputs: Vec<Vec<f64>> = features
            .iter()
            .map(|row| x_scaler.transform_all(row))
            .collect();
        let outputs = y_scaler.transform_all(targets);

        let mut rng = StdRng::seed_from_u64(settings.random_state);
        let mut network = LstmNetwork::init(settings.units, settings.summary_units(), &mut rng);
        let mut optimizer = Adam::new(&network, settings.learning_rate);
        let keep = if settings.dropout > 0.0 {
            Some(Bernoulli::new(1.0 - settings.dropout).map_err(|e| {
                ForecastError::InvalidConfig(format!("dropout: {e}"))
            })?)
        } else {
            None
        };

        let mut loss_history = Vec::with_capacity(settings.epochs);
        for epoch in 0..settings.epochs {
            let mut squared_error = 0.0;
            for batch_start in (0..n_train).step_by(settings.batch_size) {
                let batch_end = (batch_start + settings.batch_size).min(n_train);
                let mut grads = network.zeros_like();
                for sample in batch_start..batch_end {
                    let masks = self.dropout_masks(n_features, keep.as_ref(), &mut rng);
                    squared_error +=
                        network.accumulate(&inputs[sample], outputs[sample], &masks, &mut grads);
                }
                let scale = (batch_end - batch_start) as f64;
                for mut grad in grads.arrays_mut() {
                    grad.mapv_inplace(|g| g / scale);
                }
                optimizer.update(&mut network, &grads);
            }

            let loss = squared_error / n_train as f64;
            if !loss.is_finite() {
                return Err(ForecastError::Math(series_math::MathError::CalculationError(
                    format!("LSTM training diverged at epoch {}", epoch + 1),
                )));
            }
            let val_loss = (n_train < n_samples).then(|| {
                (n_train..n_samples)
                    .map(|i| (network.predict(&inputs[i]) - outputs[i]).powi(2))
                    .sum::<f64>()
                    / (n_samples - n_train) as f64
            });
            debug!(epoch = epoch + 1, loss, val_loss = ?val_loss, "LSTM epoch finished");
            loss_history.push(loss);
        }

        self.fitted = Some(FittedLstm {
            network,
            x_scaler,
            y_scaler,
            n_features,
            loss_history,
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
                fitted.y_scaler.inverse(fitted.network.predict(&scaled))
            })
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn name(&self) -> String {
        format!(
            "LSTM({}, {})",
            self.settings.units,
            self.settings.summary_units()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use serde_json::json;

    fn sine_windows(count: usize, lookback: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let series: Vec<f64> = (0..count + lookback)
            .map(|t| (t as f64 * 0.3).sin() * 5.0 + 20.0)
            .collect();
        let features = (0..count).map(|s| series[s..s + lookback].to_vec()).collect();
        let targets = (0..count).map(|s| series[s + lookback]).collect();
        (features, targets)
    }

    fn tiny() -> LstmForecaster {
        LstmForecaster::new(LstmSettings {
            units: 6,
            epochs: 25,
            batch_size: 8,
            learning_rate: 1e-2,
            ..LstmSettings::default()
        })
        .unwrap()
    }

    fn perturbed(network: &LstmNetwork, array: usize, index: usize, delta: f64) -> LstmNetwork {
        let mut copy = network.clone();
        {
            let mut arrays = copy.arrays_mut();
            if let Some(value) = arrays[array].iter_mut().nth(index) {
                *value += delta;
            }
        }
        copy
    }

    #[test]
    fn backpropagation_matches_finite_differences() {
        let mut rng = StdRng::seed_from_u64(3);
        let network = LstmNetwork::init(2, 1, &mut rng);
        let window = [0.3, -0.2, 0.5];
        let target = 0.7;
        let masks = vec![Array1::ones(2); window.len()];

        let mut grads = network.zeros_like();
        network.accumulate(&window, target, &masks, &mut grads);

        let eps = 1e-6;
        let analytic = grads.arrays();
        for (array, values) in analytic.iter().enumerate() {
            for (index, expected) in values.iter().enumerate() {
                let up = perturbed(&network, array, index, eps).predict(&window);
                let down = perturbed(&network, array, index, -eps).predict(&window);
                let numeric = ((up - target).powi(2) - (down - target).powi(2)) / (2.0 * eps);
                assert_relative_eq!(*expected, numeric, epsilon = 1e-6, max_relative = 1e-4);
            }
        }
    }

    #[test]
    fn training_reduces_loss() {
        let (features, targets) = sine_windows(80, 5);
        let mut model = tiny();
        model.fit(&features, &targets).unwrap();

        let history = model.loss_history().unwrap();
        assert_eq!(history.len(), 25);
        assert!(history.last().unwrap() < history.first().unwrap());

        let predictions = model.predict(&features[..4]).unwrap();
        assert_eq!(predictions.len(), 4);
        assert!(predictions.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn same_seed_gives_identical_predictions() {
        let (features, targets) = sine_windows(30, 4);
        let mut first = tiny();
        let mut second = tiny();
        first.fit(&features, &targets).unwrap();
        second.fit(&features, &targets).unwrap();
        assert_eq!(
            first.predict(&features).unwrap(),
            second.predict(&features).unwrap()
        );
    }

    #[test]
    fn validation_tail_does_not_change_the_fit() {
        let (features, targets) = sine_windows(30, 4);
        let mut shifted_features = features.clone();
        let mut shifted_targets = targets.clone();
        // default validation_split of 0.1 holds out the last 3 windows
        for row in &mut shifted_features[27..] {
            row.iter_mut().for_each(|v| *v *= 100.0);
        }
        for target in &mut shifted_targets[27..] {
            *target = -500.0;
        }

        let mut original = tiny();
        let mut shifted = tiny();
        original.fit(&features, &targets).unwrap();
        shifted.fit(&shifted_features, &shifted_targets).unwrap();

        assert_eq!(original.loss_history(), shifted.loss_history());
        assert_eq!(
            original.predict(&features[..27]).unwrap(),
            shifted.predict(&features[..27]).unwrap()
        );
    }

    #[test]
    fn predict_checks_width_and_fit_state() {
        let unfitted = tiny();
        assert!(matches!(
            unfitted.predict(&[vec![1.0; 4]]),
            Err(ForecastError::NotFitted(_))
        ));

        let (features, targets) = sine_windows(20, 4);
        let mut model = tiny();
        model.fit(&features, &targets).unwrap();
        assert!(matches!(
            model.predict(&[vec![1.0; 3]]),
            Err(ForecastError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn validation_split_must_leave_training_windows() {
        let mut model = LstmForecaster::new(LstmSettings {
            validation_split: 0.5,
            ..LstmSettings::default()
        })
        .unwrap();
        assert!(matches!(
            model.fit(&[vec![1.0, 2.0]], &[3.0]),
            Err(ForecastError::InvalidConfig(_))
        ));
    }

    #[test]
    fn second_layer_has_half_the_units() {
        let params: ModelParams = serde_json::from_value(json!({"units": 1})).unwrap();
        let model = LstmForecaster::from_params(&params).unwrap();
        assert_eq!(model.name(), "LSTM(1, 1)");
        let default = LstmForecaster::from_params(&ModelParams::new()).unwrap();
        assert_eq!(default.name(), "LSTM(64, 32)");
    }

    #[rstest]
    #[case(json!({"units": 0}))]
    #[case(json!({"dropout": 1.0}))]
    #[case(json!({"validation_split": 1.0}))]
    #[case(json!({"epochs": 0}))]
    #[case(json!({"learning_rate": -0.1}))]
    fn invalid_settings_are_rejected(#[case] params: serde_json::Value) {
        let params: ModelParams = serde_json::from_value(params).unwrap();
        assert!(matches!(
            LstmForecaster::from_params(&params),
            Err(ForecastError::InvalidConfig(_))
        ));
    }
}
