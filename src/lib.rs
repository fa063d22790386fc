//! # NyxsOwl
//!
//! Umbrella crate for the NyxsOwl insights workspace.
//!
//! - [`series_math`]: seasonal decomposition and robust statistics
//! - [`insight_models`]: the forecaster, the engagement classifier and the anomaly detector
//! - [`nyxs_insights`]: the async orchestrator tying them together
//!
//! ## Example
//!
//! ```
//! use nyxs_owl_workspace::series_math::decompose;
//!
//! let series: Vec<f64> = (0..24).map(|i| 100.0 + 10.0 * i as f64).collect();
//! let parts = decompose(&series, 12).unwrap();
//!
//! assert_eq!(parts.pattern().len(), 12);
//! assert!(parts.residual().iter().all(|r| r.abs() < 1e-6));
//! ```

pub use insight_models;
pub use nyxs_insights;
pub use series_math;

pub use nyxs_insights::{
    AnomalyReport, ForecastInsights, InsightsConfig, InsightsError, InsightsOrchestrator,
    TrainingConfig,
};
