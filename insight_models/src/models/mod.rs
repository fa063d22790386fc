//! Trainable models and their shared lifecycle
//!
//! Every model moves through the same phases:
//!
//! ```text
//! Uninitialized --initialize/train--> Initialized --train--> Trained
//!        \______________________________________________/
//!                              |
//!                           release --> Released
//! ```
//!
//! A failed training run leaves the model in the phase it had before the call.

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod autoencoder;
pub mod classifier;
pub mod forecaster;

pub use autoencoder::{AnomalyDetection, AutoencoderAnomalyDetector};
pub use classifier::{EngagementClassifier, EngagementFeatures, ENGAGEMENT_FEATURES};
pub use forecaster::RegressionForecaster;

/// Seed used when a model is built without an explicit one
pub const DEFAULT_SEED: u64 = 42;

/// Lifecycle phase of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelPhase {
    Uninitialized,
    Initialized,
    Trained,
    Released,
}

impl fmt::Display for ModelPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelPhase::Uninitialized => "uninitialized",
            ModelPhase::Initialized => "initialized",
            ModelPhase::Trained => "trained",
            ModelPhase::Released => "released",
        };
        write!(f, "{}", name)
    }
}

/// Learned state of a model in each phase
#[derive(Debug, Clone)]
pub(crate) enum ModelState<N> {
    Uninitialized,
    Initialized(N),
    Trained(N),
    Released,
}

impl<N> ModelState<N> {
    pub fn phase(&self) -> ModelPhase {
        match self {
            ModelState::Uninitialized => ModelPhase::Uninitialized,
            ModelState::Initialized(_) => ModelPhase::Initialized,
            ModelState::Trained(_) => ModelPhase::Trained,
            ModelState::Released => ModelPhase::Released,
        }
    }

    /// The network if the architecture is fixed, `None` if not yet initialized
    pub fn architecture(&self) -> Result<Option<&N>> {
        match self {
            ModelState::Uninitialized => Ok(None),
            ModelState::Initialized(network) | ModelState::Trained(network) => Ok(Some(network)),
            ModelState::Released => Err(ModelError::ModelReleased),
        }
    }

    /// The network of a trained model
    pub fn trained(&self) -> Result<&N> {
        match self {
            ModelState::Trained(network) => Ok(network),
            ModelState::Released => Err(ModelError::ModelReleased),
            _ => Err(ModelError::ModelNotTrained),
        }
    }

    /// Drop the learned parameters; returns whether anything was held
    pub fn release(&mut self) -> bool {
        let held = matches!(self, ModelState::Initialized(_) | ModelState::Trained(_));
        *self = ModelState::Released;
        held
    }
}

/// Behaviour shared by the forecaster, the classifier and the anomaly detector
pub trait InsightModel {
    /// Human-readable model name
    fn name(&self) -> &str;

    /// Current lifecycle phase
    fn phase(&self) -> ModelPhase;

    /// Free the model's parameters. Every later call fails with
    /// [`ModelError::ModelReleased`].
    fn release(&mut self);

    fn is_trained(&self) -> bool {
        self.phase() == ModelPhase::Trained
    }
}
