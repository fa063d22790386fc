//! # Nyxs Insights
//!
//! Async orchestration of the NyxsOwl insights models.
//!
//! ## Features
//!
//! - Forecasts: seasonal decomposition, lag-window training and recursive multi-step prediction
//! - Anomaly reports from an autoencoder with an IQR threshold
//! - Engagement scoring over four behavioural features
//! - Per-model serialized access; distinct models run concurrently
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nyxs_insights::{InsightsConfig, InsightsOrchestrator, TrainingConfig};
//!
//! # async fn run() -> nyxs_insights::Result<()> {
//! let orchestrator = InsightsOrchestrator::new(InsightsConfig::default())?;
//! let series: Vec<f64> = (0..48).map(|i| 100.0 + i as f64).collect();
//!
//! let insights = orchestrator
//!     .generate_forecast(&series, &TrainingConfig::default())
//!     .await?;
//! println!("next: {:?} (confidence {:.2})", insights.predictions, insights.confidence);
//!
//! orchestrator.dispose().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod features;
pub mod orchestrator;
pub mod shared;

pub use crate::config::{ConfidenceHeuristic, InsightsConfig};
pub use crate::error::{InsightsError, Result, Stage};
pub use crate::orchestrator::{AnomalyReport, ForecastInsights, InsightsOrchestrator, ModelPhases};
pub use insight_models::{
    DirectoryStore, EngagementFeatures, FeatureMatrix, MemoryStore, ModelError, ModelMetrics,
    ModelPhase, ModelStore, TrainingConfig,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
