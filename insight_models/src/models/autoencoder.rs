//! Reconstruction-error anomaly detection
//!
//! An autoencoder learns to reproduce its input through a narrow bottleneck.
//! Records it reconstructs badly are unlike the training data. The cut-off
//! is the upper outlier fence of the training-set reconstruction errors:
//!
//! ```text
//! threshold = Q3 + k * (Q3 - Q1)      (k = 1.5 by default)
//! ```
//!
//! Inputs are expected to be scaled to `[0, 1]` (see
//! [`FeatureMatrix::min_max_scaled`]); the sigmoid output layer cannot
//! reproduce anything outside that range.

use super::{InsightModel, ModelPhase, ModelState, DEFAULT_SEED};
use crate::data::{FeatureMatrix, ModelMetrics, TrainingConfig};
use crate::error::{ModelError, Result};
use crate::nn::{self, Activation, Loss, Sequential};
use crate::persistence::PersistentModel;
use ndarray::Axis;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use series_math::stats::{outlier_fence, TUKEY_FENCE};
use tracing::{info, warn};

/// Encoder and decoder stacked into one network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Autoencoder {
    network: Sequential,
    /// Number of leading layers forming the encoder
    encoder_depth: usize,
}

impl Autoencoder {
    /// `d -> d/2 -> d/4` encoder mirrored by a `d/4 -> d/2 -> d` decoder
    fn build(dim: usize, rng: &mut StdRng) -> Result<Self> {
        let half = (dim / 2).max(1);
        let quarter = (dim / 4).max(1);

        let network = Sequential::builder(dim)
            .dense(half, Activation::Relu)
            .dense(quarter, Activation::Relu)
            .dense(half, Activation::Relu)
            .dense(dim, Activation::Sigmoid)
            .build(rng)?;

        Ok(Self {
            network,
            encoder_depth: 2,
        })
    }

    pub fn input_dim(&self) -> usize {
        self.network.input_dim()
    }

    pub fn latent_dim(&self) -> usize {
        self.network
            .dense_layers()
            .nth(self.encoder_depth - 1)
            .map(|dense| dense.outputs())
            .unwrap_or_else(|| self.input_dim())
    }

    /// Layer shapes must chain, the output must match the input and the
    /// encoder must stop short of the last layer
    fn check_shapes(&self) -> Result<()> {
        self.network.check_shapes()?;
        if self.network.output_dim() != self.network.input_dim() {
            return Err(ModelError::Persistence(format!(
                "Autoencoder maps {} values to {}",
                self.network.input_dim(),
                self.network.output_dim()
            )));
        }
        if self.encoder_depth == 0 || self.encoder_depth >= self.network.layers().len() {
            return Err(ModelError::Persistence(format!(
                "Encoder depth {} does not fit a {}-layer network",
                self.encoder_depth,
                self.network.layers().len()
            )));
        }
        Ok(())
    }

    /// Mean squared reconstruction error of every row
    fn reconstruction_errors(&self, data: &FeatureMatrix) -> Result<Vec<f64>> {
        let reconstruction = self.network.predict(data.view())?;
        let squared = (&reconstruction - &data.view()).mapv(|d| d * d);
        squared
            .mean_axis(Axis(1))
            .map(|errors| errors.to_vec())
            .ok_or_else(|| ModelError::InsufficientData("No columns to score".to_string()))
    }
}

/// Flags, scores and threshold produced by one detection pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyDetection {
    /// Whether each record's error exceeds the threshold
    pub anomalies: Vec<bool>,
    /// Reconstruction error of each record
    pub scores: Vec<f64>,
    /// Threshold derived at training time
    pub threshold: f64,
}

impl AnomalyDetection {
    /// Number of flagged records
    pub fn anomaly_count(&self) -> usize {
        self.anomalies.iter().filter(|&&flag| flag).count()
    }
}

/// Autoencoder-based anomaly detector with an IQR-derived threshold
#[derive(Debug, Clone)]
pub struct AutoencoderAnomalyDetector {
    name: String,
    seed: u64,
    rng: StdRng,
    fence_multiplier: f64,
    state: ModelState<Autoencoder>,
    threshold: Option<f64>,
}

impl Default for AutoencoderAnomalyDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoencoderAnomalyDetector {
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            name: "Autoencoder Anomaly Detector".to_string(),
            seed,
            rng: StdRng::seed_from_u64(seed),
            fence_multiplier: TUKEY_FENCE,
            state: ModelState::Uninitialized,
            threshold: None,
        }
    }

    /// Scale of the interquartile range added to Q3; takes effect at the next `train`
    pub fn with_fence_multiplier(mut self, multiplier: f64) -> Result<Self> {
        if !multiplier.is_finite() || multiplier < 0.0 {
            return Err(ModelError::InvalidParameter(format!(
                "Fence multiplier must be a non-negative finite number, got {}",
                multiplier
            )));
        }
        self.fence_multiplier = multiplier;
        Ok(self)
    }

    pub fn fence_multiplier(&self) -> f64 {
        self.fence_multiplier
    }

    /// Threshold of the last successful training run
    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    /// Record width the architecture was built for
    pub fn feature_dim(&self) -> Option<usize> {
        self.state
            .architecture()
            .ok()
            .flatten()
            .map(|autoencoder| autoencoder.input_dim())
    }

    /// Fix the architecture for records of `dim` values
    pub fn initialize(&mut self, dim: usize) -> Result<()> {
        let autoencoder = self.architecture_for(dim)?;
        if self.state.phase() == ModelPhase::Uninitialized {
            self.state = ModelState::Initialized(autoencoder);
        }
        Ok(())
    }

    /// Copy of the current autoencoder, or a freshly built one; leaves the state untouched
    fn architecture_for(&mut self, dim: usize) -> Result<Autoencoder> {
        if let Some(autoencoder) = self.state.architecture()? {
            if autoencoder.input_dim() != dim {
                return Err(ModelError::DimensionMismatch {
                    expected: autoencoder.input_dim(),
                    actual: dim,
                });
            }
            return Ok(autoencoder.clone());
        }

        let autoencoder = Autoencoder::build(dim, &mut self.rng)?;
        info!(
            model = %self.name,
            input_dim = dim,
            latent_dim = autoencoder.latent_dim(),
            "model initialized"
        );
        Ok(autoencoder)
    }

    /// Learn to reconstruct `data`, then derive the anomaly threshold from
    /// the reconstruction errors of every supplied record.
    ///
    /// Model and threshold only change when both steps succeed.
    pub fn train(&mut self, data: &FeatureMatrix, config: &TrainingConfig) -> Result<ModelMetrics> {
        config.validate()?;
        let mut working = self.architecture_for(data.width())?;

        let outcome = nn::fit(
            &mut working.network,
            data,
            data.view(),
            Loss::MeanSquaredError,
            config,
            &mut self.rng,
        )
        .and_then(|metrics| {
            let errors = working.reconstruction_errors(data)?;
            let threshold = outlier_fence(&errors, self.fence_multiplier)?;
            Ok((metrics, threshold))
        });

        match outcome {
            Ok((metrics, threshold)) => {
                info!(
                    model = %self.name,
                    loss = metrics.loss,
                    threshold,
                    "model trained"
                );
                self.state = ModelState::Trained(working);
                self.threshold = Some(threshold);
                Ok(metrics)
            }
            Err(err) => {
                warn!(model = %self.name, error = %err, "training failed");
                Err(err)
            }
        }
    }

    /// Score and flag every record in one pass
    pub fn evaluate(&self, data: &FeatureMatrix) -> Result<AnomalyDetection> {
        let autoencoder = self.state.trained()?;
        let threshold = self.threshold.ok_or(ModelError::ModelNotTrained)?;

        let scores = autoencoder.reconstruction_errors(data)?;
        let anomalies = scores.iter().map(|&score| score > threshold).collect();

        Ok(AnomalyDetection {
            anomalies,
            scores,
            threshold,
        })
    }

    /// Whether each record is anomalous
    pub fn detect(&self, data: &FeatureMatrix) -> Result<Vec<bool>> {
        Ok(self.evaluate(data)?.anomalies)
    }

    /// Reconstruction error of each record
    pub fn scores(&self, data: &FeatureMatrix) -> Result<Vec<f64>> {
        Ok(self.evaluate(data)?.scores)
    }

    /// Latent representation of each record
    pub fn encode(&self, data: &FeatureMatrix) -> Result<FeatureMatrix> {
        let autoencoder = self.state.trained()?;
        let latent = autoencoder
            .network
            .predict_through(data.view(), autoencoder.encoder_depth)?;
        FeatureMatrix::from_array(latent)
    }
}

impl InsightModel for AutoencoderAnomalyDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> ModelPhase {
        self.state.phase()
    }

    fn release(&mut self) {
        self.threshold = None;
        if self.state.release() {
            info!(model = %self.name, "model released");
        }
    }
}

/// Persisted form of a trained [`AutoencoderAnomalyDetector`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorSnapshot {
    seed: u64,
    fence_multiplier: f64,
    threshold: f64,
    autoencoder: Autoencoder,
}

impl PersistentModel for AutoencoderAnomalyDetector {
    const KIND: &'static str = "autoencoder_anomaly_detector";
    type Snapshot = DetectorSnapshot;

    fn snapshot(&self) -> Result<DetectorSnapshot> {
        let autoencoder = self.state.trained()?.clone();
        let threshold = self.threshold.ok_or(ModelError::ModelNotTrained)?;
        Ok(DetectorSnapshot {
            seed: self.seed,
            fence_multiplier: self.fence_multiplier,
            threshold,
            autoencoder,
        })
    }

    fn restore(snapshot: DetectorSnapshot) -> Result<Self> {
        snapshot.autoencoder.check_shapes()?;
        if !snapshot.threshold.is_finite() {
            return Err(ModelError::Persistence(format!(
                "Stored threshold {} is not finite",
                snapshot.threshold
            )));
        }
        let mut model = Self::with_seed(snapshot.seed).with_fence_multiplier(snapshot.fence_multiplier)?;
        model.state = ModelState::Trained(snapshot.autoencoder);
        model.threshold = Some(snapshot.threshold);
        Ok(model)
    }
}
