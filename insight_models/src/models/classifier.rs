//! Binary engagement-likelihood classifier

use super::{InsightModel, ModelPhase, ModelState, DEFAULT_SEED};
use crate::data::{FeatureMatrix, ModelMetrics, TrainingConfig};
use crate::error::{ModelError, Result};
use crate::nn::{self, Activation, Loss, Sequential};
use crate::persistence::PersistentModel;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Number of engagement features per record
pub const ENGAGEMENT_FEATURES: usize = 4;

/// One engagement record
pub type EngagementFeatures = [f64; ENGAGEMENT_FEATURES];

/// Probability at or above which a record counts as engaged
pub const DECISION_THRESHOLD: f64 = 0.5;

const FIRST_HIDDEN: usize = 16;
const SECOND_HIDDEN: usize = 8;
const DROPOUT: f64 = 0.2;

/// Sigmoid classifier over four engagement features
#[derive(Debug, Clone)]
pub struct EngagementClassifier {
    name: String,
    seed: u64,
    rng: StdRng,
    state: ModelState<Sequential>,
}

impl Default for EngagementClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EngagementClassifier {
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            name: "Engagement Classifier".to_string(),
            seed,
            rng: StdRng::seed_from_u64(seed),
            state: ModelState::Uninitialized,
        }
    }

    /// Build a feature matrix from typed engagement records
    pub fn feature_matrix(records: &[EngagementFeatures]) -> Result<FeatureMatrix> {
        FeatureMatrix::from_rows(records)
    }

    /// Fix the architecture. The input width is always [`ENGAGEMENT_FEATURES`].
    pub fn initialize(&mut self) -> Result<()> {
        let network = self.working_architecture()?;
        if self.state.phase() == ModelPhase::Uninitialized {
            self.state = ModelState::Initialized(network);
        }
        Ok(())
    }

    /// Copy of the current architecture, or a freshly built one; leaves the state untouched
    fn working_architecture(&mut self) -> Result<Sequential> {
        if let Some(network) = self.state.architecture()? {
            return Ok(network.clone());
        }

        let network = Sequential::builder(ENGAGEMENT_FEATURES)
            .dense(FIRST_HIDDEN, Activation::Relu)
            .dropout(DROPOUT)
            .dense(SECOND_HIDDEN, Activation::Relu)
            .dense(1, Activation::Sigmoid)
            .build(&mut self.rng)?;

        info!(model = %self.name, params = network.num_params(), "model initialized");
        Ok(network)
    }

    /// Fit to 0/1 `labels`; reports accuracy alongside the cross-entropy loss.
    ///
    /// Nothing changes unless training succeeds.
    pub fn train(
        &mut self,
        features: &FeatureMatrix,
        labels: &[f64],
        config: &TrainingConfig,
    ) -> Result<ModelMetrics> {
        config.validate()?;
        check_width(features)?;
        if labels.len() != features.rows() {
            return Err(ModelError::ValidationError(format!(
                "Got {} feature rows but {} labels",
                features.rows(),
                labels.len()
            )));
        }
        if let Some(label) = labels.iter().find(|&&l| l != 0.0 && l != 1.0) {
            return Err(ModelError::ValidationError(format!(
                "Engagement labels must be 0 or 1, got {}",
                label
            )));
        }

        let mut working = self.working_architecture()?;

        let targets = Array2::from_shape_vec((labels.len(), 1), labels.to_vec())
            .map_err(|e| ModelError::ValidationError(e.to_string()))?;

        match nn::fit(
            &mut working,
            features,
            targets.view(),
            Loss::BinaryCrossEntropy,
            config,
            &mut self.rng,
        ) {
            Ok(metrics) => {
                info!(
                    model = %self.name,
                    loss = metrics.loss,
                    accuracy = metrics.accuracy,
                    "model trained"
                );
                self.state = ModelState::Trained(working);
                Ok(metrics)
            }
            Err(err) => {
                warn!(model = %self.name, error = %err, "training failed");
                Err(err)
            }
        }
    }

    /// Engagement probability per record, each in `[0, 1]`
    pub fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        let network = self.state.trained()?;
        check_width(features)?;
        let output = network.predict(features.view())?;
        Ok(output.column(0).to_vec())
    }

    /// Engaged / not engaged per record at the 0.5 decision threshold
    pub fn classify(&self, features: &FeatureMatrix) -> Result<Vec<bool>> {
        Ok(self
            .predict(features)?
            .into_iter()
            .map(|p| p >= DECISION_THRESHOLD)
            .collect())
    }
}

fn check_width(features: &FeatureMatrix) -> Result<()> {
    if features.width() != ENGAGEMENT_FEATURES {
        return Err(ModelError::DimensionMismatch {
            expected: ENGAGEMENT_FEATURES,
            actual: features.width(),
        });
    }
    Ok(())
}

impl InsightModel for EngagementClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> ModelPhase {
        self.state.phase()
    }

    fn release(&mut self) {
        if self.state.release() {
            info!(model = %self.name, "model released");
        }
    }
}

/// Persisted form of a trained [`EngagementClassifier`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierSnapshot {
    seed: u64,
    network: Sequential,
}

impl PersistentModel for EngagementClassifier {
    const KIND: &'static str = "engagement_classifier";
    type Snapshot = ClassifierSnapshot;

    fn snapshot(&self) -> Result<ClassifierSnapshot> {
        Ok(ClassifierSnapshot {
            seed: self.seed,
            network: self.state.trained()?.clone(),
        })
    }

    fn restore(snapshot: ClassifierSnapshot) -> Result<Self> {
        if snapshot.network.input_dim() != ENGAGEMENT_FEATURES {
            return Err(ModelError::DimensionMismatch {
                expected: ENGAGEMENT_FEATURES,
                actual: snapshot.network.input_dim(),
            });
        }
        snapshot.network.check_shapes()?;
        if snapshot.network.output_dim() != 1 {
            return Err(ModelError::Persistence(format!(
                "Classifier network must have one output, found {}",
                snapshot.network.output_dim()
            )));
        }
        let mut model = Self::with_seed(snapshot.seed);
        model.state = ModelState::Trained(snapshot.network);
        Ok(model)
    }
}
