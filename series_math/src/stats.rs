//! Descriptive statistics used by the models and the orchestrator
//!
//! Contains:
//! - Quartiles and the interquartile-range outlier fence
//! - Population variance
//! - Min-max scaling

use crate::{MathError, Result};
use statrs::statistics::{Data, OrderStatistics, Statistics};

/// Multiplier of the classic Tukey outlier fence
pub const TUKEY_FENCE: f64 = 1.5;

/// Lower and upper quartiles of a sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quartiles {
    pub q1: f64,
    pub q3: f64,
}

impl Quartiles {
    /// Interquartile range (Q3 - Q1)
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    /// Upper fence `Q3 + multiplier * IQR`
    pub fn upper_fence(&self, multiplier: f64) -> f64 {
        self.q3 + multiplier * self.iqr()
    }
}

/// Compute the lower and upper quartiles of `values`
pub fn quartiles(values: &[f64]) -> Result<Quartiles> {
    ensure_finite_sample(values, "quartiles")?;

    let mut data = Data::new(values.to_vec());
    Ok(Quartiles {
        q1: data.lower_quartile(),
        q3: data.upper_quartile(),
    })
}

/// Upper outlier fence of `values`: `Q3 + multiplier * (Q3 - Q1)`.
///
/// Values strictly above the fence are outliers.
pub fn outlier_fence(values: &[f64], multiplier: f64) -> Result<f64> {
    if !multiplier.is_finite() || multiplier < 0.0 {
        return Err(MathError::InvalidInput(format!(
            "Fence multiplier must be a non-negative finite number, got {}",
            multiplier
        )));
    }

    Ok(quartiles(values)?.upper_fence(multiplier))
}

/// Population variance (divides by `n`)
pub fn population_variance(values: &[f64]) -> Result<f64> {
    ensure_finite_sample(values, "variance")?;
    Ok(values.iter().population_variance())
}

/// Scale `values` linearly onto `[0, 1]`.
///
/// A constant sample maps to all zeros.
pub fn min_max_scale(values: &[f64]) -> Result<Vec<f64>> {
    ensure_finite_sample(values, "min-max scaling")?;

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    if span.abs() < f64::EPSILON {
        return Ok(vec![0.0; values.len()]);
    }

    Ok(values.iter().map(|v| (v - min) / span).collect())
}

fn ensure_finite_sample(values: &[f64], what: &str) -> Result<()> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(format!(
            "Cannot compute {} of an empty sample",
            what
        )));
    }

    if values.iter().any(|v| !v.is_finite()) {
        return Err(MathError::CalculationError(format!(
            "Cannot compute {} of a sample containing non-finite values",
            what
        )));
    }

    Ok(())
}
