//! Dense and dropout layers

use crate::error::{ModelError, Result};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::distributions::{Bernoulli, Distribution, Uniform};
use rand::Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

/// Elementwise activation applied after a dense layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
}

impl Activation {
    pub(crate) fn apply(&self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Linear => z.clone(),
            Activation::Relu => z.mapv(|v| v.max(0.0)),
            Activation::Sigmoid => z.mapv(sigmoid),
        }
    }

    /// Derivative with respect to the pre-activation, given the activated output
    pub(crate) fn derivative(&self, z: &Array2<f64>, a: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::Linear => Array2::ones(z.raw_dim()),
            Activation::Relu => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Sigmoid => a.mapv(|s| s * (1.0 - s)),
        }
    }
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Fully connected layer: `activation(x · W + b)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    weights: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

impl Dense {
    /// Create a layer with randomly initialized weights and zero bias.
    ///
    /// ReLU layers use He-normal initialization, the others Glorot-uniform.
    pub fn new<R: Rng + ?Sized>(
        inputs: usize,
        outputs: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Result<Self> {
        if inputs == 0 || outputs == 0 {
            return Err(ModelError::InvalidParameter(format!(
                "Dense layer needs non-zero widths, got {} -> {}",
                inputs, outputs
            )));
        }

        let weights = match activation {
            Activation::Relu => {
                let std_dev = (2.0 / inputs as f64).sqrt();
                let normal = Normal::new(0.0, std_dev)
                    .map_err(|e| ModelError::InvalidParameter(e.to_string()))?;
                Array2::from_shape_simple_fn((inputs, outputs), || normal.sample(&mut *rng))
            }
            Activation::Linear | Activation::Sigmoid => {
                let limit = (6.0 / (inputs + outputs) as f64).sqrt();
                let uniform = Uniform::new(-limit, limit);
                Array2::from_shape_simple_fn((inputs, outputs), || uniform.sample(&mut *rng))
            }
        };

        Ok(Self {
            weights,
            bias: Array1::zeros(outputs),
            activation,
        })
    }

    pub fn inputs(&self) -> usize {
        self.weights.nrows()
    }

    pub fn outputs(&self) -> usize {
        self.weights.ncols()
    }

    pub(crate) fn bias_len(&self) -> usize {
        self.bias.len()
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub(crate) fn weights_mut(&mut self) -> (&mut Array2<f64>, &mut Array1<f64>) {
        (&mut self.weights, &mut self.bias)
    }

    /// Pre-activation and activated output for a batch
    pub(crate) fn forward(&self, input: ArrayView2<'_, f64>) -> (Array2<f64>, Array2<f64>) {
        let z = input.dot(&self.weights) + &self.bias;
        let a = self.activation.apply(&z);
        (z, a)
    }

    /// Gradients of the weights and bias, plus the gradient passed to the previous layer
    pub(crate) fn backward(
        &self,
        input: &Array2<f64>,
        z: &Array2<f64>,
        a: &Array2<f64>,
        grad_output: &Array2<f64>,
    ) -> (DenseGradients, Array2<f64>) {
        let delta = grad_output * &self.activation.derivative(z, a);
        let grads = DenseGradients {
            weights: input.t().dot(&delta),
            bias: delta.sum_axis(Axis(0)),
        };
        let grad_input = delta.dot(&self.weights.t());
        (grads, grad_input)
    }
}

/// Gradients of one dense layer
#[derive(Debug, Clone)]
pub(crate) struct DenseGradients {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

/// Inverted dropout: zeroes a fraction of activations during training only
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dropout {
    rate: f64,
}

impl Dropout {
    pub fn new(rate: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&rate) {
            return Err(ModelError::InvalidParameter(format!(
                "Dropout rate must be in [0, 1), got {}",
                rate
            )));
        }
        Ok(Self { rate })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Scaled keep-mask for a batch of the given shape
    pub(crate) fn mask<R: Rng + ?Sized>(&self, shape: (usize, usize), rng: &mut R) -> Result<Array2<f64>> {
        let keep = 1.0 - self.rate;
        let bernoulli =
            Bernoulli::new(keep).map_err(|e| ModelError::InvalidParameter(e.to_string()))?;
        Ok(Array2::from_shape_simple_fn(shape, || {
            if bernoulli.sample(&mut *rng) {
                1.0 / keep
            } else {
                0.0
            }
        }))
    }
}

/// One layer of a [`Sequential`](super::Sequential) network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Layer {
    Dense(Dense),
    Dropout(Dropout),
}
