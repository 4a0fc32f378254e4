//! Dense feed-forward network for binary classification.
//!
//! Layers are stored row-major (`weights[u * inputs + i]`) so the whole
//! network serializes as plain vectors. Training is mini-batch backprop on
//! binary cross-entropy with the Adam optimiser; the output layer is always a
//! single sigmoid unit.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::linalg::dot;
use crate::result::{AiError, AiResult};

const PROBABILITY_EPSILON: f64 = 1e-7;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Sigmoid,
}

impl Activation {
    fn apply(self, z: f64) -> f64 {
        match self {
            Activation::Relu => z.max(0.0),
            Activation::Sigmoid => sigmoid(z),
        }
    }

    fn derivative(self, z: f64) -> f64 {
        match self {
            Activation::Relu => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Sigmoid => {
                let s = sigmoid(z);
                s * (1.0 - s)
            }
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Binary cross-entropy of a single prediction.
pub fn binary_cross_entropy(probability: f64, target: f64) -> f64 {
    let p = probability.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
    -(target * p.ln() + (1.0 - target) * (1.0 - p).ln())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub inputs: usize,
    pub units: usize,
    pub activation: Activation,
    pub weights: Vec<f64>,
    pub biases: Vec<f64>,
}

impl DenseLayer {
    /// Glorot-uniform initialised layer with zero biases.
    fn new<R: Rng + ?Sized>(inputs: usize, units: usize, activation: Activation, rng: &mut R) -> Self {
        let limit = (6.0 / (inputs + units) as f64).sqrt();
        let weights = (0..inputs * units)
            .map(|_| rng.gen_range(-limit..=limit))
            .collect();
        Self {
            inputs,
            units,
            activation,
            weights,
            biases: vec![0.0; units],
        }
    }

    fn pre_activation(&self, input: &[f64]) -> Vec<f64> {
        (0..self.units)
            .map(|u| {
                let row = &self.weights[u * self.inputs..(u + 1) * self.inputs];
                self.biases[u] + dot(row, input)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<DenseLayer>,
    /// Dropout rate applied to the first hidden layer's output while training.
    pub dropout: f64,
}

/// Intermediate values of one training forward pass.
struct Trace {
    /// `activations[0]` is the input; `activations[l + 1]` is layer `l`'s
    /// (post-dropout) output.
    activations: Vec<Vec<f64>>,
    pre: Vec<Vec<f64>>,
    masks: Vec<Option<Vec<f64>>>,
}

impl Network {
    /// `inputs -> hidden[0] (relu) -> dropout -> hidden[1..] (relu) -> 1 (sigmoid)`.
    pub fn binary_classifier<R: Rng + ?Sized>(
        inputs: usize,
        hidden: &[usize],
        dropout: f64,
        rng: &mut R,
    ) -> Self {
        let mut layers = Vec::with_capacity(hidden.len() + 1);
        let mut width = inputs;
        for &units in hidden {
            layers.push(DenseLayer::new(width, units, Activation::Relu, rng));
            width = units;
        }
        layers.push(DenseLayer::new(width, 1, Activation::Sigmoid, rng));
        Self { layers, dropout }
    }

    pub fn input_width(&self) -> usize {
        self.layers.first().map(|l| l.inputs).unwrap_or(0)
    }

    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.weights.len() + l.biases.len())
            .sum()
    }

    /// Check that the layer shapes chain from the input to a single output
    /// unit and that every parameter is finite.
    pub fn validate(&self) -> AiResult<()> {
        let Some(last) = self.layers.last() else {
            return Err(AiError::invalid_artifact("network has no layers"));
        };
        if last.units != 1 {
            return Err(AiError::invalid_artifact(format!(
                "output layer has {} units, expected 1",
                last.units
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(AiError::invalid_artifact("dropout must be in [0, 1)"));
        }

        let mut width = self.input_width();
        for (l, layer) in self.layers.iter().enumerate() {
            if layer.inputs == 0 || layer.units == 0 {
                return Err(AiError::invalid_artifact(format!("layer {l} has an empty shape")));
            }
            if layer.inputs != width {
                return Err(AiError::invalid_artifact(format!(
                    "layer {l} expects {} inputs but receives {width}",
                    layer.inputs
                )));
            }
            let expected = layer.inputs.checked_mul(layer.units);
            if expected != Some(layer.weights.len()) || layer.biases.len() != layer.units {
                return Err(AiError::invalid_artifact(format!(
                    "layer {l} is {}x{} but stores {} weights and {} biases",
                    layer.inputs,
                    layer.units,
                    layer.weights.len(),
                    layer.biases.len()
                )));
            }
            if layer.weights.iter().chain(&layer.biases).any(|v| !v.is_finite()) {
                return Err(AiError::invalid_artifact(format!(
                    "layer {l} has a non-finite parameter"
                )));
            }
            width = layer.units;
        }
        Ok(())
    }

    /// Positive-class probability (inference mode, no dropout).
    pub fn predict_proba(&self, input: &[f64]) -> f64 {
        let mut a = input.to_vec();
        for layer in &self.layers {
            a = layer
                .pre_activation(&a)
                .into_iter()
                .map(|z| layer.activation.apply(z))
                .collect();
        }
        a.first().copied().unwrap_or(0.0)
    }

    fn forward_train<R: Rng + ?Sized>(&self, input: &[f64], rng: &mut R) -> Trace {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        let mut pre = Vec::with_capacity(self.layers.len());
        let mut masks = Vec::with_capacity(self.layers.len());
        activations.push(input.to_vec());

        let last = self.layers.len() - 1;
        for (l, layer) in self.layers.iter().enumerate() {
            let z = layer.pre_activation(&activations[l]);
            let mut out: Vec<f64> = z.iter().map(|v| layer.activation.apply(*v)).collect();

            let mask = if l == 0 && l != last && self.dropout > 0.0 {
                let keep = 1.0 - self.dropout;
                let m: Vec<f64> = (0..out.len())
                    .map(|_| if rng.gen_bool(keep) { 1.0 / keep } else { 0.0 })
                    .collect();
                for (o, k) in out.iter_mut().zip(&m) {
                    *o *= k;
                }
                Some(m)
            } else {
                None
            };

            pre.push(z);
            masks.push(mask);
            activations.push(out);
        }

        Trace {
            activations,
            pre,
            masks,
        }
    }

    /// One optimiser step over `batch`; returns the mean batch loss.
    pub fn train_batch<R: Rng + ?Sized>(
        &mut self,
        batch: &[(&[f64], f64)],
        optimizer: &mut Adam,
        rng: &mut R,
    ) -> f64 {
        if batch.is_empty() {
            return 0.0;
        }

        let mut grad_w: Vec<Vec<f64>> = self.layers.iter().map(|l| vec![0.0; l.weights.len()]).collect();
        let mut grad_b: Vec<Vec<f64>> = self.layers.iter().map(|l| vec![0.0; l.biases.len()]).collect();
        let mut loss = 0.0;

        for (input, target) in batch {
            let trace = self.forward_train(input, &mut *rng);
            let output = trace.activations[self.layers.len()][0];
            loss += binary_cross_entropy(output, *target);

            // Sigmoid + BCE: dL/dz of the output unit.
            let mut delta = vec![output - target];

            for l in (0..self.layers.len()).rev() {
                let layer = &self.layers[l];
                let layer_input = &trace.activations[l];
                for u in 0..layer.units {
                    grad_b[l][u] += delta[u];
                    let row = &mut grad_w[l][u * layer.inputs..(u + 1) * layer.inputs];
                    for (g, x) in row.iter_mut().zip(layer_input) {
                        *g += delta[u] * x;
                    }
                }

                if l == 0 {
                    break;
                }

                let prev = &self.layers[l - 1];
                let mut prev_delta = vec![0.0; layer.inputs];
                for (i, pd) in prev_delta.iter_mut().enumerate() {
                    let mut sum = 0.0;
                    for u in 0..layer.units {
                        sum += layer.weights[u * layer.inputs + i] * delta[u];
                    }
                    if let Some(mask) = &trace.masks[l - 1] {
                        sum *= mask[i];
                    }
                    *pd = sum * prev.activation.derivative(trace.pre[l - 1][i]);
                }
                delta = prev_delta;
            }
        }

        let scale = 1.0 / batch.len() as f64;
        for g in grad_w.iter_mut().chain(grad_b.iter_mut()) {
            for v in g.iter_mut() {
                *v *= scale;
            }
        }
        optimizer.step(&mut self.layers, &grad_w, &grad_b);

        loss * scale
    }

    /// Mean loss and accuracy (threshold 0.5) over `rows`.
    pub fn evaluate(&self, rows: &[(&[f64], f64)]) -> (f64, f64) {
        if rows.is_empty() {
            return (0.0, 0.0);
        }
        let mut loss = 0.0;
        let mut correct = 0usize;
        for (input, target) in rows {
            let p = self.predict_proba(input);
            loss += binary_cross_entropy(p, *target);
            if (p > 0.5) == (*target > 0.5) {
                correct += 1;
            }
        }
        let n = rows.len() as f64;
        (loss / n, correct as f64 / n)
    }
}

/// Adam optimiser state, one moment buffer per parameter tensor.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    step: i32,
    m_w: Vec<Vec<f64>>,
    v_w: Vec<Vec<f64>>,
    m_b: Vec<Vec<f64>>,
    v_b: Vec<Vec<f64>>,
}

impl Adam {
    pub fn new(network: &Network, learning_rate: f64) -> Self {
        let zeros_w: Vec<Vec<f64>> = network.layers.iter().map(|l| vec![0.0; l.weights.len()]).collect();
        let zeros_b: Vec<Vec<f64>> = network.layers.iter().map(|l| vec![0.0; l.biases.len()]).collect();
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            step: 0,
            m_w: zeros_w.clone(),
            v_w: zeros_w,
            m_b: zeros_b.clone(),
            v_b: zeros_b,
        }
    }

    fn step(&mut self, layers: &mut [DenseLayer], grad_w: &[Vec<f64>], grad_b: &[Vec<f64>]) {
        self.step = self.step.saturating_add(1);
        let bias1 = 1.0 - self.beta1.powi(self.step);
        let bias2 = 1.0 - self.beta2.powi(self.step);

        for (l, layer) in layers.iter_mut().enumerate() {
            update(
                &mut layer.weights,
                &grad_w[l],
                &mut self.m_w[l],
                &mut self.v_w[l],
                (self.learning_rate, self.beta1, self.beta2, self.epsilon, bias1, bias2),
            );
            update(
                &mut layer.biases,
                &grad_b[l],
                &mut self.m_b[l],
                &mut self.v_b[l],
                (self.learning_rate, self.beta1, self.beta2, self.epsilon, bias1, bias2),
            );
        }
    }
}

fn update(
    params: &mut [f64],
    grads: &[f64],
    m: &mut [f64],
    v: &mut [f64],
    (lr, beta1, beta2, eps, bias1, bias2): (f64, f64, f64, f64, f64, f64),
) {
    for i in 0..params.len() {
        let g = grads[i];
        m[i] = beta1 * m[i] + (1.0 - beta1) * g;
        v[i] = beta2 * v[i] + (1.0 - beta2) * g * g;
        let m_hat = m[i] / bias1;
        let v_hat = v[i] / bias2;
        params[i] -= lr * m_hat / (v_hat.sqrt() + eps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn architecture_matches_request() {
        let mut rng = StdRng::seed_from_u64(7);
        let net = Network::binary_classifier(3, &[64, 32], 0.2, &mut rng);
        let shapes: Vec<(usize, usize, Activation)> = net
            .layers
            .iter()
            .map(|l| (l.inputs, l.units, l.activation))
            .collect();
        assert_eq!(
            shapes,
            vec![
                (3, 64, Activation::Relu),
                (64, 32, Activation::Relu),
                (32, 1, Activation::Sigmoid)
            ]
        );
        assert_eq!(net.parameter_count(), 3 * 64 + 64 + 64 * 32 + 32 + 32 + 1);
        assert_eq!(net.input_width(), 3);
    }

    #[test]
    fn probabilities_are_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(1);
        let net = Network::binary_classifier(2, &[8], 0.0, &mut rng);
        for x in [[-100.0, 50.0], [0.0, 0.0], [1e3, 1e3]] {
            let p = net.predict_proba(&x);
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn training_reduces_loss_on_separable_data() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut net = Network::binary_classifier(1, &[8], 0.0, &mut rng);
        let mut adam = Adam::new(&net, 0.05);
        let xs: Vec<[f64; 1]> = (-10..=10).filter(|i| *i != 0).map(|i| [i as f64 / 5.0]).collect();
        let rows: Vec<(&[f64], f64)> = xs
            .iter()
            .map(|x| (x.as_slice(), if x[0] > 0.0 { 1.0 } else { 0.0 }))
            .collect();

        let (initial_loss, _) = net.evaluate(&rows);
        for _ in 0..200 {
            net.train_batch(&rows, &mut adam, &mut rng);
        }
        let (final_loss, accuracy) = net.evaluate(&rows);
        assert!(final_loss < initial_loss);
        assert!(accuracy >= 0.9);
    }

    #[test]
    fn trained_shapes_validate() {
        let mut rng = StdRng::seed_from_u64(5);
        let net = Network::binary_classifier(3, &[64, 32], 0.2, &mut rng);
        assert!(net.validate().is_ok());
    }

    #[test]
    fn inconsistent_shapes_are_rejected() {
        let mut rng = StdRng::seed_from_u64(5);
        let net = Network::binary_classifier(2, &[4], 0.0, &mut rng);

        let mut short = net.clone();
        short.layers[0].weights.pop();
        assert!(matches!(short.validate(), Err(AiError::InvalidArtifact(_))));

        let mut unchained = net.clone();
        unchained.layers[1].inputs = 3;
        unchained.layers[1].weights = vec![0.1; 3];
        assert!(unchained.validate().is_err());

        let mut missing_bias = net.clone();
        missing_bias.layers[0].biases.clear();
        assert!(missing_bias.validate().is_err());

        let empty = Network {
            layers: Vec::new(),
            dropout: 0.0,
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn survives_serde_round_trip() {
        let mut rng = StdRng::seed_from_u64(9);
        let net = Network::binary_classifier(2, &[4], 0.1, &mut rng);
        let json = serde_json::to_string(&net).unwrap();
        let back: Network = serde_json::from_str(&json).unwrap();
        assert_eq!(back.predict_proba(&[0.3, -0.7]), net.predict_proba(&[0.3, -0.7]));
    }
}
