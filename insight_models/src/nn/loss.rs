//! Training objectives

use ndarray::{Array2, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

/// Clamp applied to probabilities before taking logarithms
const PROBABILITY_EPSILON: f64 = 1e-7;

/// Loss minimized during training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Loss {
    /// Mean of squared differences over every output element
    MeanSquaredError,
    /// Binary cross-entropy over sigmoid probabilities
    BinaryCrossEntropy,
}

impl Loss {
    /// Mean loss over a batch
    pub fn value(&self, predicted: ArrayView2<'_, f64>, target: ArrayView2<'_, f64>) -> f64 {
        let count = predicted.len().max(1) as f64;
        let total = match self {
            Loss::MeanSquaredError => Zip::from(predicted)
                .and(target)
                .fold(0.0, |acc, &p, &t| acc + (p - t).powi(2)),
            Loss::BinaryCrossEntropy => Zip::from(predicted).and(target).fold(0.0, |acc, &p, &t| {
                let p = p.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
                acc - (t * p.ln() + (1.0 - t) * (1.0 - p).ln())
            }),
        };
        total / count
    }

    /// Gradient of [`Loss::value`] with respect to each predicted element
    pub fn gradient(&self, predicted: &Array2<f64>, target: ArrayView2<'_, f64>) -> Array2<f64> {
        let count = predicted.len().max(1) as f64;
        match self {
            Loss::MeanSquaredError => {
                Zip::from(predicted)
                    .and(target)
                    .map_collect(|&p, &t| 2.0 * (p - t) / count)
            }
            Loss::BinaryCrossEntropy => Zip::from(predicted).and(target).map_collect(|&p, &t| {
                let p = p.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
                (p - t) / (p * (1.0 - p)) / count
            }),
        }
    }

    /// Whether accuracy is meaningful for this objective
    pub fn reports_accuracy(&self) -> bool {
        matches!(self, Loss::BinaryCrossEntropy)
    }
}

/// Fraction of probabilities on the same side of 0.5 as their 0/1 target
pub fn binary_accuracy(predicted: ArrayView2<'_, f64>, target: ArrayView2<'_, f64>) -> f64 {
    let count = predicted.len().max(1) as f64;
    let correct = Zip::from(predicted).and(target).fold(0usize, |acc, &p, &t| {
        if (p >= 0.5) == (t >= 0.5) {
            acc + 1
        } else {
            acc
        }
    });
    correct as f64 / count
}
