//! The insights orchestrator
//!
//! Owns one forecaster, one anomaly detector and one engagement classifier
//! and composes them with the decomposer and the lag-window feature builder.
//! Every component failure comes back as [`InsightsError::Component`] tagged
//! with the pipeline step that raised it.

use crate::config::InsightsConfig;
use crate::error::{AtStage, InsightsError, Result, Stage};
use crate::features::{lag_windows, latest_window};
use crate::shared::SharedModel;
use insight_models::{
    AnomalyDetection, AutoencoderAnomalyDetector, EngagementClassifier, EngagementFeatures,
    FeatureMatrix, InsightModel, ModelMetrics, ModelPhase, ModelStore, PersistentModel,
    RegressionForecaster, TrainingConfig,
};
use serde::Serialize;
use series_math::stats::population_variance;
use series_math::{decompose, Decomposition};
use std::sync::Arc;
use tracing::{info, instrument};

/// Everything one forecast call produces
#[derive(Debug, Clone, Serialize)]
pub struct ForecastInsights {
    /// `horizon` values following the series, in order
    pub predictions: Vec<f64>,
    /// Heuristic confidence in `[min, max]` of the configured heuristic
    pub confidence: f64,
    /// Population variance of the decomposition residual
    pub residual_variance: f64,
    pub decomposition: Decomposition,
    /// Metrics of the training run behind the predictions
    pub metrics: ModelMetrics,
}

/// Everything one anomaly report produces
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyReport {
    /// Whether each record was flagged
    pub anomalies: Vec<bool>,
    /// Reconstruction error of each record
    pub scores: Vec<f64>,
    /// Threshold the scores were compared against
    pub threshold: f64,
    pub metrics: ModelMetrics,
}

impl AnomalyReport {
    pub fn anomaly_count(&self) -> usize {
        self.anomalies.iter().filter(|&&flag| flag).count()
    }

    fn new(detection: AnomalyDetection, metrics: ModelMetrics) -> Self {
        Self {
            anomalies: detection.anomalies,
            scores: detection.scores,
            threshold: detection.threshold,
            metrics,
        }
    }
}

/// Lifecycle phase of every owned model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelPhases {
    pub forecaster: ModelPhase,
    pub detector: ModelPhase,
    pub classifier: ModelPhase,
}

/// Caller-owned facade over the insights models
pub struct InsightsOrchestrator {
    config: InsightsConfig,
    forecaster: SharedModel<RegressionForecaster>,
    detector: SharedModel<AutoencoderAnomalyDetector>,
    classifier: SharedModel<EngagementClassifier>,
}

impl InsightsOrchestrator {
    /// Build an orchestrator with freshly seeded models
    pub fn new(config: InsightsConfig) -> Result<Self> {
        config.validate()?;

        let detector = AutoencoderAnomalyDetector::with_seed(config.seed)
            .with_fence_multiplier(config.fence_multiplier)
            .map_err(|err| InsightsError::InvalidConfig(err.to_string()))?;

        info!(
            period = config.period,
            lag_window = config.lag_window,
            horizon = config.horizon,
            seed = config.seed,
            "insights orchestrator created"
        );

        Ok(Self {
            config,
            forecaster: SharedModel::new(RegressionForecaster::with_seed(config.seed)),
            detector: SharedModel::new(detector),
            classifier: SharedModel::new(EngagementClassifier::with_seed(config.seed)),
        })
    }

    pub fn config(&self) -> &InsightsConfig {
        &self.config
    }

    /// Decompose `series`, train the forecaster on its lag windows and
    /// forecast the next `horizon` values.
    #[instrument(skip_all, fields(observations = series.len()))]
    pub async fn generate_forecast(
        &self,
        series: &[f64],
        training: &TrainingConfig,
    ) -> Result<ForecastInsights> {
        let decomposition = decompose(series, self.config.period).at(Stage::Decomposition)?;
        let (features, labels) =
            lag_windows(series, self.config.lag_window).at(Stage::FeatureConstruction)?;
        let window = latest_window(series, self.config.lag_window).at(Stage::FeatureConstruction)?;

        let horizon = self.config.horizon;
        let training = *training;
        let (metrics, predictions) = self
            .forecaster
            .run(move |model| {
                let metrics = model.train(&features, &labels, &training)?;
                let predictions = forecast_recursive(model, window, horizon)?;
                Ok::<_, insight_models::ModelError>((metrics, predictions))
            })
            .await?
            .at(Stage::Forecasting)?;

        let residual_variance =
            population_variance(decomposition.residual()).at(Stage::Decomposition)?;
        let confidence = self.config.confidence.score(residual_variance);

        info!(
            horizon,
            confidence,
            residual_variance,
            loss = metrics.loss,
            "forecast generated"
        );

        Ok(ForecastInsights {
            predictions,
            confidence,
            residual_variance,
            decomposition,
            metrics,
        })
    }

    /// Forecast the next `horizon` values with the already trained forecaster
    pub async fn forecast(&self, series: &[f64]) -> Result<Vec<f64>> {
        let window = latest_window(series, self.config.lag_window).at(Stage::FeatureConstruction)?;
        let horizon = self.config.horizon;
        self.forecaster
            .run(move |model| forecast_recursive(model, window, horizon))
            .await?
            .at(Stage::Forecasting)
    }

    /// Train the anomaly detector on `records` and flag the outliers among them
    #[instrument(skip_all, fields(records = records.rows(), width = records.width()))]
    pub async fn generate_anomaly_report(
        &self,
        records: &FeatureMatrix,
        training: &TrainingConfig,
    ) -> Result<AnomalyReport> {
        let records = records.clone();
        let training = *training;
        let report = self
            .detector
            .run(move |detector| {
                let metrics = detector.train(&records, &training)?;
                let detection = detector.evaluate(&records)?;
                Ok::<_, insight_models::ModelError>(AnomalyReport::new(detection, metrics))
            })
            .await?
            .at(Stage::AnomalyDetection)?;

        info!(
            anomalies = report.anomaly_count(),
            threshold = report.threshold,
            "anomaly report generated"
        );
        Ok(report)
    }

    /// Score new records against the detector's current threshold without retraining
    pub async fn score_anomalies(&self, records: &FeatureMatrix) -> Result<AnomalyDetection> {
        let records = records.clone();
        self.detector
            .run(move |detector| detector.evaluate(&records))
            .await?
            .at(Stage::AnomalyDetection)
    }

    /// Fit the engagement classifier to labelled records
    #[instrument(skip_all, fields(records = records.len()))]
    pub async fn train_engagement(
        &self,
        records: &[EngagementFeatures],
        labels: &[f64],
        training: &TrainingConfig,
    ) -> Result<ModelMetrics> {
        let features = EngagementClassifier::feature_matrix(records).at(Stage::Engagement)?;
        let labels = labels.to_vec();
        let training = *training;
        self.classifier
            .run(move |classifier| classifier.train(&features, &labels, &training))
            .await?
            .at(Stage::Engagement)
    }

    /// Engagement probability per record
    pub async fn score_engagement(&self, records: &[EngagementFeatures]) -> Result<Vec<f64>> {
        let features = EngagementClassifier::feature_matrix(records).at(Stage::Engagement)?;
        self.classifier
            .run(move |classifier| classifier.predict(&features))
            .await?
            .at(Stage::Engagement)
    }

    pub async fn save_forecaster(&self, store: Arc<dyn ModelStore>, key: &str) -> Result<()> {
        save_model(&self.forecaster, store, key).await
    }

    /// Replace the forecaster with the one stored under `key`
    pub async fn load_forecaster(&self, store: Arc<dyn ModelStore>, key: &str) -> Result<()> {
        load_model(&self.forecaster, store, key).await
    }

    pub async fn save_detector(&self, store: Arc<dyn ModelStore>, key: &str) -> Result<()> {
        save_model(&self.detector, store, key).await
    }

    /// Replace the anomaly detector with the one stored under `key`
    pub async fn load_detector(&self, store: Arc<dyn ModelStore>, key: &str) -> Result<()> {
        load_model(&self.detector, store, key).await
    }

    pub async fn save_classifier(&self, store: Arc<dyn ModelStore>, key: &str) -> Result<()> {
        save_model(&self.classifier, store, key).await
    }

    /// Replace the engagement classifier with the one stored under `key`
    pub async fn load_classifier(&self, store: Arc<dyn ModelStore>, key: &str) -> Result<()> {
        load_model(&self.classifier, store, key).await
    }

    pub async fn phases(&self) -> ModelPhases {
        ModelPhases {
            forecaster: self.forecaster.inspect(|m| m.phase()).await,
            detector: self.detector.inspect(|m| m.phase()).await,
            classifier: self.classifier.inspect(|m| m.phase()).await,
        }
    }

    /// Release every model. Waits for in-flight calls on each model to
    /// finish; every later call fails with `ModelReleased`.
    pub async fn dispose(&self) -> Result<()> {
        self.forecaster.run(|m| m.release()).await?;
        self.detector.run(|m| m.release()).await?;
        self.classifier.run(|m| m.release()).await?;
        info!("insights orchestrator disposed");
        Ok(())
    }
}

/// Predict `horizon` steps, feeding each prediction back into the window
fn forecast_recursive(
    model: &RegressionForecaster,
    mut window: Vec<f64>,
    horizon: usize,
) -> insight_models::Result<Vec<f64>> {
    let mut predictions = Vec::with_capacity(horizon);
    for _ in 0..horizon {
        let next = model
            .predict(&FeatureMatrix::single_row(&window)?)?
            .first()
            .copied()
            .ok_or_else(|| {
                insight_models::ModelError::TrainingFailed(
                    "Forecaster produced no output".to_string(),
                )
            })?;
        predictions.push(next);
        window.remove(0);
        window.push(next);
    }
    Ok(predictions)
}

async fn save_model<M>(shared: &SharedModel<M>, store: Arc<dyn ModelStore>, key: &str) -> Result<()>
where
    M: PersistentModel + Send + 'static,
{
    let key = key.to_string();
    shared
        .run(move |model| model.save(store.as_ref(), &key))
        .await?
        .at(Stage::Persistence)
}

/// Released models stay released; a load never revives them
async fn load_model<M>(shared: &SharedModel<M>, store: Arc<dyn ModelStore>, key: &str) -> Result<()>
where
    M: PersistentModel + InsightModel + Send + 'static,
{
    let key = key.to_string();
    shared
        .run(move |model| {
            if model.phase() == ModelPhase::Released {
                return Err(insight_models::ModelError::ModelReleased);
            }
            *model = M::load(store.as_ref(), &key)?;
            Ok::<_, insight_models::ModelError>(())
        })
        .await?
        .at(Stage::Persistence)
}
