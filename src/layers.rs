//! Dense layer with weights, bias, and an activation function.
use crate::activations::Activation;
use ndarray::{Array1, Array2};
use rand::Rng;
use std::sync::Arc;

/// A fully-connected (dense) layer.
///
/// Weights are stored with shape `(input_size, output_size)` so that a batch
/// of rows `x` maps through `x · W + b`.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
    pub activation: Arc<dyn Activation + Send + Sync>,
}

impl DenseLayer {
    /// Create a new dense layer using He (Kaiming) uniform initialization and
    /// a small positive bias. All randomness is drawn from `rng`.
    pub fn new(
        input_size: usize,
        output_size: usize,
        activation: Arc<dyn Activation + Send + Sync>,
        rng: &mut impl Rng,
    ) -> Self {
        // He uniform: U(-sqrt(6/fan_in), sqrt(6/fan_in))
        let limit = (6.0f64 / (input_size as f64)).sqrt();
        let weights =
            Array2::from_shape_fn((input_size, output_size), |_| rng.gen_range(-limit..limit));
        let bias = Array1::from_elem(output_size, 0.01);
        Self {
            weights,
            bias,
            activation,
        }
    }

    /// Number of input features.
    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    /// Number of output units.
    pub fn output_size(&self) -> usize {
        self.weights.ncols()
    }

    /// Forward pass over a batch: pre-activations `z = x·W + b` and
    /// activations `a = act(z)`.
    pub fn forward(&self, input: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
        let z = input.dot(&self.weights) + &self.bias;
        let a = self.activation.apply_batch(&z);
        (z, a)
    }
}
