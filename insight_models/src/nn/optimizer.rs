//! Adam optimizer with per-parameter adaptive step sizes

use super::layers::DenseGradients;
use super::network::Sequential;
use crate::error::{ModelError, Result};
use ndarray::{Array1, Array2, Zip};

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-7;

/// First and second moment estimates of one dense layer
#[derive(Debug, Clone)]
struct Moments {
    m_weights: Array2<f64>,
    v_weights: Array2<f64>,
    m_bias: Array1<f64>,
    v_bias: Array1<f64>,
}

/// Adam optimizer state for one network
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    step: i32,
    moments: Vec<Moments>,
}

impl Adam {
    /// Zeroed optimizer state shaped after `network`
    pub fn new(network: &Sequential, learning_rate: f64) -> Self {
        let moments = network
            .dense_layers()
            .map(|dense| Moments {
                m_weights: Array2::zeros((dense.inputs(), dense.outputs())),
                v_weights: Array2::zeros((dense.inputs(), dense.outputs())),
                m_bias: Array1::zeros(dense.outputs()),
                v_bias: Array1::zeros(dense.outputs()),
            })
            .collect();

        Self {
            learning_rate,
            step: 0,
            moments,
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Apply one update to every dense layer of `network`
    pub(crate) fn apply(&mut self, network: &mut Sequential, grads: &[DenseGradients]) -> Result<()> {
        if grads.len() != self.moments.len() {
            return Err(ModelError::TrainingFailed(format!(
                "Expected gradients for {} layers, got {}",
                self.moments.len(),
                grads.len()
            )));
        }

        self.step += 1;
        let correction1 = 1.0 - BETA1.powi(self.step);
        let correction2 = 1.0 - BETA2.powi(self.step);
        let lr = self.learning_rate;

        for ((dense, moments), grad) in network
            .dense_layers_mut()
            .zip(self.moments.iter_mut())
            .zip(grads)
        {
            let (weights, bias) = dense.weights_mut();

            Zip::from(weights)
                .and(&mut moments.m_weights)
                .and(&mut moments.v_weights)
                .and(&grad.weights)
                .for_each(|w, m, v, &g| {
                    *m = BETA1 * *m + (1.0 - BETA1) * g;
                    *v = BETA2 * *v + (1.0 - BETA2) * g * g;
                    *w -= lr * (*m / correction1) / ((*v / correction2).sqrt() + EPSILON);
                });

            Zip::from(bias)
                .and(&mut moments.m_bias)
                .and(&mut moments.v_bias)
                .and(&grad.bias)
                .for_each(|b, m, v, &g| {
                    *m = BETA1 * *m + (1.0 - BETA1) * g;
                    *v = BETA2 * *v + (1.0 - BETA2) * g * g;
                    *b -= lr * (*m / correction1) / ((*v / correction2).sqrt() + EPSILON);
                });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::layers::Activation;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_step_moves_against_gradient() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut network = Sequential::builder(1)
            .dense(1, Activation::Linear)
            .build(&mut rng)
            .unwrap();
        let mut adam = Adam::new(&network, 0.1);

        let input = Array2::from_elem((1, 1), 1.0);
        let before = network.predict(input.view()).unwrap()[[0, 0]];

        // Positive gradient on every parameter pushes the output down
        let grads = vec![DenseGradients {
            weights: Array2::from_elem((1, 1), 1.0),
            bias: Array1::from_elem(1, 1.0),
        }];
        adam.apply(&mut network, &grads).unwrap();

        let after = network.predict(input.view()).unwrap()[[0, 0]];
        assert!(after < before);
    }

    #[test]
    fn test_gradient_count_must_match() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut network = Sequential::builder(2)
            .dense(2, Activation::Relu)
            .dense(1, Activation::Linear)
            .build(&mut rng)
            .unwrap();
        let mut adam = Adam::new(&network, 0.01);

        assert!(matches!(
            adam.apply(&mut network, &[]),
            Err(ModelError::TrainingFailed(_))
        ));
    }
}
