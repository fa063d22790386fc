//! Feed-forward regression over lag-window features

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

/// Units in the first hidden layer
pub const DEFAULT_FIRST_HIDDEN: usize = 64;
/// Units in the second hidden layer
pub const DEFAULT_SECOND_HIDDEN: usize = 32;
/// Dropout applied after the first hidden layer
pub const DEFAULT_DROPOUT: f64 = 0.2;

/// Regression network predicting the next value of a series.
///
/// Architecture: `input -> dense(ReLU) -> dropout -> dense(ReLU) -> dense(linear)`,
/// trained with mean squared error and Adam.
#[derive(Debug, Clone)]
pub struct RegressionForecaster {
    /// Name of the model
    name: String,
    hidden_units: (usize, usize),
    dropout_rate: f64,
    seed: u64,
    rng: StdRng,
    state: ModelState<Sequential>,
}

impl Default for RegressionForecaster {
    fn default() -> Self {
        Self::new()
    }
}

impl RegressionForecaster {
    /// Create an uninitialized forecaster with the default seed
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Create an uninitialized forecaster whose weights and dropout masks derive from `seed`
    pub fn with_seed(seed: u64) -> Self {
        Self {
            name: "Regression Forecaster".to_string(),
            hidden_units: (DEFAULT_FIRST_HIDDEN, DEFAULT_SECOND_HIDDEN),
            dropout_rate: DEFAULT_DROPOUT,
            seed,
            rng: StdRng::seed_from_u64(seed),
            state: ModelState::Uninitialized,
        }
    }

    /// Override the hidden layer widths
    pub fn with_hidden_units(mut self, first: usize, second: usize) -> Result<Self> {
        if first == 0 || second == 0 {
            return Err(ModelError::InvalidParameter(
                "Hidden layers need at least one unit".to_string(),
            ));
        }
        self.hidden_units = (first, second);
        Ok(self)
    }

    /// Override the dropout rate
    pub fn with_dropout(mut self, rate: f64) -> Result<Self> {
        nn::Dropout::new(rate)?;
        self.dropout_rate = rate;
        Ok(self)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Feature width the architecture was built for
    pub fn feature_dim(&self) -> Option<usize> {
        self.state
            .architecture()
            .ok()
            .flatten()
            .map(|network| network.input_dim())
    }

    /// Fix the architecture for `feature_dim` inputs.
    ///
    /// Calling it again with the same width is a no-op.
    pub fn initialize(&mut self, feature_dim: usize) -> Result<()> {
        let network = self.architecture_for(feature_dim)?;
        if self.state.phase() == ModelPhase::Uninitialized {
            self.state = ModelState::Initialized(network);
        }
        Ok(())
    }

    /// Copy of the current architecture, or a freshly built one when none is fixed yet.
    ///
    /// Leaves the model state untouched.
    fn architecture_for(&mut self, feature_dim: usize) -> Result<Sequential> {
        if let Some(network) = self.state.architecture()? {
            if network.input_dim() != feature_dim {
                return Err(ModelError::DimensionMismatch {
                    expected: network.input_dim(),
                    actual: feature_dim,
                });
            }
            return Ok(network.clone());
        }

        let network = Sequential::builder(feature_dim)
            .dense(self.hidden_units.0, Activation::Relu)
            .dropout(self.dropout_rate)
            .dense(self.hidden_units.1, Activation::Relu)
            .dense(1, Activation::Linear)
            .build(&mut self.rng)?;

        info!(
            model = %self.name,
            feature_dim,
            params = network.num_params(),
            "model initialized"
        );
        Ok(network)
    }

    /// Fit the network to `labels`, building it from the feature width if needed.
    ///
    /// The model only changes when training succeeds; a failed first run
    /// leaves it uninitialized.
    pub fn train(
        &mut self,
        features: &FeatureMatrix,
        labels: &[f64],
        config: &TrainingConfig,
    ) -> Result<ModelMetrics> {
        config.validate()?;
        if labels.len() != features.rows() {
            return Err(ModelError::ValidationError(format!(
                "Got {} feature rows but {} labels",
                features.rows(),
                labels.len()
            )));
        }

        let mut working = self.architecture_for(features.width())?;

        let targets = Array2::from_shape_vec((labels.len(), 1), labels.to_vec())
            .map_err(|e| ModelError::ValidationError(e.to_string()))?;

        match nn::fit(
            &mut working,
            features,
            targets.view(),
            Loss::MeanSquaredError,
            config,
            &mut self.rng,
        ) {
            Ok(metrics) => {
                info!(
                    model = %self.name,
                    loss = metrics.loss,
                    validation_loss = metrics.validation_loss,
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

    /// Predict one value per feature row
    pub fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        let network = self.state.trained()?;
        let output = network.predict(features.view())?;
        Ok(output.column(0).to_vec())
    }
}

impl InsightModel for RegressionForecaster {
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

/// Persisted form of a trained [`RegressionForecaster`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecasterSnapshot {
    seed: u64,
    hidden_units: (usize, usize),
    dropout_rate: f64,
    network: Sequential,
}

impl PersistentModel for RegressionForecaster {
    const KIND: &'static str = "regression_forecaster";
    type Snapshot = ForecasterSnapshot;

    fn snapshot(&self) -> Result<ForecasterSnapshot> {
        Ok(ForecasterSnapshot {
            seed: self.seed,
            hidden_units: self.hidden_units,
            dropout_rate: self.dropout_rate,
            network: self.state.trained()?.clone(),
        })
    }

    fn restore(snapshot: ForecasterSnapshot) -> Result<Self> {
        let mut model = Self::with_seed(snapshot.seed)
            .with_hidden_units(snapshot.hidden_units.0, snapshot.hidden_units.1)?
            .with_dropout(snapshot.dropout_rate)?;
        snapshot.network.check_shapes()?;
        if snapshot.network.output_dim() != 1 {
            return Err(ModelError::Persistence(format!(
                "Forecaster network must have one output, found {}",
                snapshot.network.output_dim()
            )));
        }
        model.state = ModelState::Trained(snapshot.network);
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_is_idempotent_for_same_width() {
        let mut model = RegressionForecaster::new();
        model.initialize(12).unwrap();
        model.initialize(12).unwrap();

        assert_eq!(model.feature_dim(), Some(12));
        assert_eq!(model.phase(), ModelPhase::Initialized);
    }

    #[test]
    fn test_initialize_rejects_other_width() {
        let mut model = RegressionForecaster::new();
        model.initialize(12).unwrap();

        assert!(matches!(
            model.initialize(10),
            Err(ModelError::DimensionMismatch {
                expected: 12,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_invalid_builder_parameters() {
        assert!(RegressionForecaster::new().with_hidden_units(0, 4).is_err());
        assert!(RegressionForecaster::new().with_dropout(1.5).is_err());
    }
}
