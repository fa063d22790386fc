//! # Insight Models
//!
//! Trainable models for the NyxsOwl insights pipeline.
//!
//! ## Features
//!
//! - A small feed-forward network toolkit (dense/dropout layers, Adam, MSE and cross-entropy)
//! - `RegressionForecaster`: next-value regression over lag-window features
//! - `EngagementClassifier`: binary engagement likelihood over four features
//! - `AutoencoderAnomalyDetector`: reconstruction-error anomaly flags with an IQR threshold
//! - Saving and restoring trained models through a keyed `ModelStore`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use insight_models::{FeatureMatrix, RegressionForecaster, TrainingConfig};
//!
//! let rows: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64, i as f64 + 1.0]).collect();
//! let labels: Vec<f64> = (0..30).map(|i| i as f64 + 2.0).collect();
//! let features = FeatureMatrix::from_rows(&rows)?;
//!
//! let mut model = RegressionForecaster::with_seed(7);
//! let metrics = model.train(&features, &labels, &TrainingConfig::default())?;
//! let next = model.predict(&FeatureMatrix::single_row(&[30.0, 31.0])?)?;
//! # Ok::<(), insight_models::ModelError>(())
//! ```

pub mod data;
pub mod error;
pub mod models;
pub mod nn;
pub mod persistence;

// Re-export commonly used types
pub use crate::data::{FeatureMatrix, ModelMetrics, TrainingConfig};
pub use crate::error::{ModelError, Result};
pub use crate::models::{
    AnomalyDetection, AutoencoderAnomalyDetector, EngagementClassifier, EngagementFeatures,
    InsightModel, ModelPhase, RegressionForecaster, ENGAGEMENT_FEATURES,
};
pub use crate::persistence::{DirectoryStore, MemoryStore, ModelStore, PersistentModel};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
