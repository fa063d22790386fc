//! Sequential feed-forward network

use super::layers::{Activation, Dense, DenseGradients, Dropout, Layer};
use crate::error::{ModelError, Result};
use ndarray::{Array2, ArrayView2};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Stack of layers applied in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequential {
    input_dim: usize,
    layers: Vec<Layer>,
}

/// Layer description used by [`SequentialBuilder`]
#[derive(Debug, Clone, Copy)]
enum LayerSpec {
    Dense(usize, Activation),
    Dropout(f64),
}

/// Builder fixing a network's architecture before its weights are drawn
#[derive(Debug, Clone)]
pub struct SequentialBuilder {
    input_dim: usize,
    specs: Vec<LayerSpec>,
}

impl SequentialBuilder {
    pub fn dense(mut self, units: usize, activation: Activation) -> Self {
        self.specs.push(LayerSpec::Dense(units, activation));
        self
    }

    pub fn dropout(mut self, rate: f64) -> Self {
        self.specs.push(LayerSpec::Dropout(rate));
        self
    }

    /// Draw initial weights and assemble the network
    pub fn build<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Sequential> {
        if self.input_dim == 0 {
            return Err(ModelError::InvalidParameter(
                "Input dimension must be greater than zero".to_string(),
            ));
        }

        let mut width = self.input_dim;
        let mut layers = Vec::with_capacity(self.specs.len());
        for spec in self.specs {
            match spec {
                LayerSpec::Dense(units, activation) => {
                    layers.push(Layer::Dense(Dense::new(width, units, activation, rng)?));
                    width = units;
                }
                LayerSpec::Dropout(rate) => layers.push(Layer::Dropout(Dropout::new(rate)?)),
            }
        }

        if !layers.iter().any(|layer| matches!(layer, Layer::Dense(_))) {
            return Err(ModelError::InvalidParameter(
                "Network needs at least one dense layer".to_string(),
            ));
        }

        Ok(Sequential {
            input_dim: self.input_dim,
            layers,
        })
    }
}

/// Values a layer saved during a training forward pass
enum Cache {
    Dense {
        input: Array2<f64>,
        z: Array2<f64>,
        a: Array2<f64>,
    },
    Dropout {
        mask: Array2<f64>,
    },
}

impl Sequential {
    pub fn builder(input_dim: usize) -> SequentialBuilder {
        SequentialBuilder {
            input_dim,
            specs: Vec::new(),
        }
    }

    /// Width of the input rows
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Width of the output rows
    pub fn output_dim(&self) -> usize {
        self.dense_layers()
            .last()
            .map(|dense| dense.outputs())
            .unwrap_or(self.input_dim)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Total number of weights and biases
    pub fn num_params(&self) -> usize {
        self.dense_layers()
            .map(|dense| dense.inputs() * dense.outputs() + dense.outputs())
            .sum()
    }

    pub(crate) fn dense_layers(&self) -> impl Iterator<Item = &Dense> {
        self.layers.iter().filter_map(|layer| match layer {
            Layer::Dense(dense) => Some(dense),
            Layer::Dropout(_) => None,
        })
    }

    pub(crate) fn dense_layers_mut(&mut self) -> impl Iterator<Item = &mut Dense> {
        self.layers.iter_mut().filter_map(|layer| match layer {
            Layer::Dense(dense) => Some(dense),
            Layer::Dropout(_) => None,
        })
    }

    /// Inference pass, dropout disabled
    pub fn predict(&self, input: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.predict_through(input, self.layers.len())
    }

    /// Inference pass through the first `depth` layers only
    pub fn predict_through(&self, input: ArrayView2<'_, f64>, depth: usize) -> Result<Array2<f64>> {
        self.check_width(input.ncols())?;

        let mut current = input.to_owned();
        for layer in self.layers.iter().take(depth) {
            if let Layer::Dense(dense) = layer {
                let (_, a) = dense.forward(current.view());
                current = a;
            }
        }
        Ok(current)
    }

    /// Training pass with dropout active; returns the output and the layer caches
    fn forward_train<R: Rng + ?Sized>(
        &self,
        input: ArrayView2<'_, f64>,
        rng: &mut R,
    ) -> Result<(Array2<f64>, Vec<Cache>)> {
        let mut caches = Vec::with_capacity(self.layers.len());
        let mut current = input.to_owned();

        for layer in &self.layers {
            match layer {
                Layer::Dense(dense) => {
                    let (z, a) = dense.forward(current.view());
                    caches.push(Cache::Dense {
                        input: current,
                        z,
                        a: a.clone(),
                    });
                    current = a;
                }
                Layer::Dropout(dropout) => {
                    let mask = dropout.mask(current.dim(), rng)?;
                    current = &current * &mask;
                    caches.push(Cache::Dropout { mask });
                }
            }
        }

        Ok((current, caches))
    }

    /// Forward pass with dropout, then backpropagate `loss_grad(output)`.
    ///
    /// Returns the output together with one gradient per dense layer, in layer order.
    pub(crate) fn gradients<R, F>(
        &self,
        input: ArrayView2<'_, f64>,
        rng: &mut R,
        loss_grad: F,
    ) -> Result<(Array2<f64>, Vec<DenseGradients>)>
    where
        R: Rng + ?Sized,
        F: FnOnce(&Array2<f64>) -> Array2<f64>,
    {
        self.check_width(input.ncols())?;

        let (output, caches) = self.forward_train(input, rng)?;
        let mut grad = loss_grad(&output);
        let mut grads = Vec::new();

        for (layer, cache) in self.layers.iter().zip(caches.iter()).rev() {
            match (layer, cache) {
                (Layer::Dense(dense), Cache::Dense { input, z, a }) => {
                    let (layer_grads, grad_input) = dense.backward(input, z, a, &grad);
                    grads.push(layer_grads);
                    grad = grad_input;
                }
                (Layer::Dropout(_), Cache::Dropout { mask }) => {
                    grad = &grad * mask;
                }
                _ => {
                    return Err(ModelError::TrainingFailed(
                        "Layer cache does not match layer kind".to_string(),
                    ))
                }
            }
        }

        grads.reverse();
        Ok((output, grads))
    }

    /// Check that every layer fits the one before it.
    ///
    /// Networks from the builder always pass; deserialized ones may not.
    pub(crate) fn check_shapes(&self) -> Result<()> {
        if self.input_dim == 0 {
            return Err(ModelError::Persistence(
                "Network has a zero input width".to_string(),
            ));
        }

        let mut width = self.input_dim;
        let mut dense_count = 0;
        for (index, layer) in self.layers.iter().enumerate() {
            match layer {
                Layer::Dense(dense) => {
                    if dense.inputs() != width || dense.outputs() == 0 {
                        return Err(ModelError::Persistence(format!(
                            "Layer {} maps {} -> {} but receives {} values",
                            index,
                            dense.inputs(),
                            dense.outputs(),
                            width
                        )));
                    }
                    if dense.bias_len() != dense.outputs() {
                        return Err(ModelError::Persistence(format!(
                            "Layer {} has {} biases for {} outputs",
                            index,
                            dense.bias_len(),
                            dense.outputs()
                        )));
                    }
                    width = dense.outputs();
                    dense_count += 1;
                }
                Layer::Dropout(dropout) => {
                    Dropout::new(dropout.rate())
                        .map_err(|e| ModelError::Persistence(format!("Layer {}: {}", index, e)))?;
                }
            }
        }

        if dense_count == 0 {
            return Err(ModelError::Persistence(
                "Network has no dense layer".to_string(),
            ));
        }
        Ok(())
    }

    fn check_width(&self, width: usize) -> Result<()> {
        if width != self.input_dim {
            return Err(ModelError::DimensionMismatch {
                expected: self.input_dim,
                actual: width,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn network() -> Sequential {
        let mut rng = StdRng::seed_from_u64(11);
        Sequential::builder(4)
            .dense(8, Activation::Relu)
            .dropout(0.2)
            .dense(1, Activation::Linear)
            .build(&mut rng)
            .unwrap()
    }

    #[test]
    fn test_shapes_and_params() {
        let net = network();
        assert_eq!(net.input_dim(), 4);
        assert_eq!(net.output_dim(), 1);
        assert_eq!(net.num_params(), 4 * 8 + 8 + 8 + 1);

        let out = net.predict(Array2::zeros((3, 4)).view()).unwrap();
        assert_eq!(out.dim(), (3, 1));
    }

    #[test]
    fn test_width_mismatch() {
        let net = network();
        let result = net.predict(Array2::zeros((1, 3)).view());
        assert!(matches!(
            result,
            Err(ModelError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_gradients_cover_every_dense_layer() {
        let net = network();
        let mut rng = StdRng::seed_from_u64(5);
        let input = Array2::ones((2, 4));
        let (output, grads) = net
            .gradients(input.view(), &mut rng, |out| out.clone())
            .unwrap();

        assert_eq!(output.dim(), (2, 1));
        assert_eq!(grads.len(), 2);
        assert_eq!(grads[0].weights.dim(), (4, 8));
        assert_eq!(grads[1].weights.dim(), (8, 1));
    }

    #[test]
    fn test_built_network_has_consistent_shapes() {
        assert!(network().check_shapes().is_ok());
    }

    #[test]
    fn test_mismatched_layers_are_rejected() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut net = network();
        net.layers[2] = Layer::Dense(Dense::new(5, 1, Activation::Linear, &mut rng).unwrap());

        assert!(matches!(net.check_shapes(), Err(ModelError::Persistence(_))));
    }

    #[test]
    fn test_needs_dense_layer() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = Sequential::builder(2).dropout(0.1).build(&mut rng);
        assert!(result.is_err());
    }
}
