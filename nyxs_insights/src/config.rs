//! Insights configuration
//!
//! Every default is a named constant. The confidence heuristic and the
//! outlier fence multiplier are empirical; they are configurable rather
//! than derived.

use crate::error::{InsightsError, Result};
use insight_models::models::DEFAULT_SEED;
use serde::{Deserialize, Serialize};

/// Monthly seasonality
pub const DEFAULT_PERIOD: usize = 12;
/// Observations per lag window
pub const DEFAULT_LAG_WINDOW: usize = 12;
/// Values forecast per call
pub const DEFAULT_HORIZON: usize = 1;
/// Residual variance at which confidence reaches zero before clamping
pub const DEFAULT_VARIANCE_SCALE: f64 = 10_000.0;
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.1;
pub const DEFAULT_MAX_CONFIDENCE: f64 = 0.95;
/// Tukey fence multiplier for the anomaly threshold
pub const DEFAULT_FENCE_MULTIPLIER: f64 = 1.5;

/// Maps residual variance to a bounded confidence score:
/// `clamp(1 - variance / variance_scale, min, max)`.
///
/// A crude noise-to-confidence mapping, not a statistical interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceHeuristic {
    pub variance_scale: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for ConfidenceHeuristic {
    fn default() -> Self {
        Self {
            variance_scale: DEFAULT_VARIANCE_SCALE,
            min: DEFAULT_MIN_CONFIDENCE,
            max: DEFAULT_MAX_CONFIDENCE,
        }
    }
}

impl ConfidenceHeuristic {
    pub fn score(&self, residual_variance: f64) -> f64 {
        (1.0 - residual_variance / self.variance_scale).clamp(self.min, self.max)
    }

    fn validate(&self) -> Result<()> {
        if !self.variance_scale.is_finite() || self.variance_scale <= 0.0 {
            return Err(InsightsError::InvalidConfig(format!(
                "Variance scale must be a positive finite number, got {}",
                self.variance_scale
            )));
        }
        if !(0.0..=1.0).contains(&self.min) || !(0.0..=1.0).contains(&self.max) || self.min > self.max {
            return Err(InsightsError::InvalidConfig(format!(
                "Confidence bounds must satisfy 0 <= min <= max <= 1, got [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Per-orchestrator settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    /// Seasonal period used for decomposition
    pub period: usize,
    /// Observations per lag-window feature row
    pub lag_window: usize,
    /// Values forecast per call
    pub horizon: usize,
    /// Seed for every model's weights and dropout masks
    pub seed: u64,
    /// Multiplier of the interquartile range in the anomaly threshold
    pub fence_multiplier: f64,
    pub confidence: ConfidenceHeuristic,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            lag_window: DEFAULT_LAG_WINDOW,
            horizon: DEFAULT_HORIZON,
            seed: DEFAULT_SEED,
            fence_multiplier: DEFAULT_FENCE_MULTIPLIER,
            confidence: ConfidenceHeuristic::default(),
        }
    }
}

impl InsightsConfig {
    pub fn with_period(mut self, period: usize) -> Self {
        self.period = period;
        self
    }

    pub fn with_lag_window(mut self, lag_window: usize) -> Self {
        self.lag_window = lag_window;
        self
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_fence_multiplier(mut self, fence_multiplier: f64) -> Self {
        self.fence_multiplier = fence_multiplier;
        self
    }

    pub fn with_confidence(mut self, confidence: ConfidenceHeuristic) -> Self {
        self.confidence = confidence;
        self
    }

    /// Check every field is in range
    pub fn validate(&self) -> Result<()> {
        if self.period == 0 {
            return Err(InsightsError::InvalidConfig(
                "Period must be greater than zero".to_string(),
            ));
        }
        if self.lag_window == 0 {
            return Err(InsightsError::InvalidConfig(
                "Lag window must be greater than zero".to_string(),
            ));
        }
        if self.horizon == 0 {
            return Err(InsightsError::InvalidConfig(
                "Horizon must be greater than zero".to_string(),
            ));
        }
        if !self.fence_multiplier.is_finite() || self.fence_multiplier < 0.0 {
            return Err(InsightsError::InvalidConfig(format!(
                "Fence multiplier must be a non-negative finite number, got {}",
                self.fence_multiplier
            )));
        }
        self.confidence.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_confidence_is_clamped() {
        let heuristic = ConfidenceHeuristic::default();

        assert_relative_eq!(heuristic.score(0.0), 0.95);
        assert_relative_eq!(heuristic.score(5_000.0), 0.5);
        assert_relative_eq!(heuristic.score(50_000.0), 0.1);
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(InsightsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let config = InsightsConfig::default().with_confidence(ConfidenceHeuristic {
            variance_scale: 1.0,
            min: 0.9,
            max: 0.2,
        });
        assert!(matches!(
            config.validate(),
            Err(InsightsError::InvalidConfig(_))
        ));
    }
}
