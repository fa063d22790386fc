//! Additive seasonal decomposition
//!
//! Splits a series into a trend (centered moving average), a repeating
//! seasonal pattern and the residual left over:
//!
//! ```text
//! series[i] = trend[i] + pattern[i % period] + residual[i]
//! ```

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Result of decomposing a series into trend, seasonal and residual parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    period: usize,
    trend: Vec<f64>,
    pattern: Vec<f64>,
    seasonal: Vec<f64>,
    residual: Vec<f64>,
}

impl Decomposition {
    /// Seasonal period used for the decomposition
    pub fn period(&self) -> usize {
        self.period
    }

    /// Trend component, one value per observation
    pub fn trend(&self) -> &[f64] {
        &self.trend
    }

    /// Seasonal component expanded to the length of the series
    pub fn seasonal(&self) -> &[f64] {
        &self.seasonal
    }

    /// One seasonal value per phase; `seasonal()[i] == pattern()[i % period]`
    pub fn pattern(&self) -> &[f64] {
        &self.pattern
    }

    /// Residual component, one value per observation
    pub fn residual(&self) -> &[f64] {
        &self.residual
    }

    /// Number of observations in the decomposed series
    pub fn len(&self) -> usize {
        self.trend.len()
    }

    /// Whether the decomposition is empty (never true for a successful decomposition)
    pub fn is_empty(&self) -> bool {
        self.trend.is_empty()
    }

    /// Sum the three components back into the original series
    pub fn reconstruct(&self) -> Vec<f64> {
        self.trend
            .iter()
            .zip(&self.seasonal)
            .zip(&self.residual)
            .map(|((t, s), r)| t + s + r)
            .collect()
    }
}

/// Decompose `series` with the given seasonal `period`.
///
/// Needs at least two full periods of data.
pub fn decompose(series: &[f64], period: usize) -> Result<Decomposition> {
    if period == 0 {
        return Err(MathError::InvalidInput(
            "Period must be greater than zero".to_string(),
        ));
    }

    if series.len() < 2 * period {
        return Err(MathError::InsufficientData(format!(
            "Decomposition with period {} needs at least {} values, have {}",
            period,
            2 * period,
            series.len()
        )));
    }

    let trend = centered_moving_average(series, period);

    let detrended: Vec<f64> = series
        .iter()
        .zip(&trend)
        .map(|(value, level)| value - level)
        .collect();

    // Average the detrended values of each phase
    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (i, value) in detrended.iter().enumerate() {
        sums[i % period] += value;
        counts[i % period] += 1;
    }
    let pattern: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(sum, &count)| sum / count as f64)
        .collect();

    let seasonal: Vec<f64> = (0..series.len()).map(|i| pattern[i % period]).collect();

    let residual = detrended
        .iter()
        .zip(&seasonal)
        .map(|(d, s)| d - s)
        .collect();

    Ok(Decomposition {
        period,
        trend,
        pattern,
        seasonal,
        residual,
    })
}

/// Centered moving average with a window of `period` observations.
///
/// The window stays symmetric around each index and shrinks near the ends of
/// the series, so every index gets a value. Even periods use the 2×m form
/// (the two outermost points weighted one half) when the full window fits.
fn centered_moving_average(series: &[f64], period: usize) -> Vec<f64> {
    let n = series.len();
    let half = period / 2;

    (0..n)
        .map(|i| {
            let h = half.min(i).min(n - 1 - i);

            if h == half && half > 0 && period % 2 == 0 {
                let inner: f64 = series[i - h + 1..i + h].iter().sum();
                let outer = 0.5 * (series[i - h] + series[i + h]);
                (inner + outer) / period as f64
            } else {
                let window = &series[i - h..=i + h];
                window.iter().sum::<f64>() / window.len() as f64
            }
        })
        .collect()
}
