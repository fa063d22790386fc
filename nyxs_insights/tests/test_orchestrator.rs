use nyxs_insights::{
    FeatureMatrix, InsightsConfig, InsightsError, InsightsOrchestrator, ModelError, Stage,
    TrainingConfig,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

/// 24 months growing by 10 each month, no noise
fn steady_growth() -> Vec<f64> {
    (0..24).map(|i| 100.0 + 10.0 * i as f64).collect()
}

/// Small-magnitude seasonal series with a gentle upward drift
fn seasonal_series(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| 0.5 + 0.01 * i as f64 + 0.1 * (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin())
        .collect()
}

fn quick_training() -> TrainingConfig {
    TrainingConfig::default()
        .with_epochs(10)
        .with_learning_rate(0.005)
        .with_batch_size(8)
}

fn orchestrator() -> InsightsOrchestrator {
    InsightsOrchestrator::new(InsightsConfig::default()).unwrap()
}

#[tokio::test]
async fn test_forecast_on_steady_growth() {
    let orchestrator = orchestrator();
    let insights = orchestrator
        .generate_forecast(&steady_growth(), &quick_training())
        .await
        .unwrap();

    assert_eq!(insights.predictions.len(), 1);
    assert!(insights.predictions[0].is_finite());

    let trend = insights.decomposition.trend();
    assert!(trend.windows(2).all(|w| w[1] > w[0]));
    assert!(insights
        .decomposition
        .residual()
        .iter()
        .all(|r| r.abs() < 1e-6));

    // No residual noise means the upper confidence bound
    assert_eq!(insights.confidence, 0.95);
    assert_eq!(insights.metrics.epochs, 10);
}

#[tokio::test]
async fn test_confidence_follows_residual_variance() {
    let orchestrator = orchestrator();
    let insights = orchestrator
        .generate_forecast(&seasonal_series(36), &quick_training())
        .await
        .unwrap();

    let config = orchestrator.config();
    assert!(insights.confidence >= config.confidence.min);
    assert!(insights.confidence <= config.confidence.max);
    assert_eq!(
        insights.confidence,
        config.confidence.score(insights.residual_variance)
    );
}

#[tokio::test]
async fn test_noisy_series_gets_lowest_confidence() {
    // Large irregular swings leave a residual variance far above the scale
    let series: Vec<f64> = (0..36)
        .map(|i| ((i * 7919 + 13) % 101) as f64 * 10.0)
        .collect();

    let orchestrator = orchestrator();
    let insights = orchestrator
        .generate_forecast(&series, &quick_training().with_epochs(3))
        .await
        .unwrap();

    assert!(insights.residual_variance > 10_000.0);
    assert_eq!(insights.confidence, 0.1);
}

#[tokio::test]
async fn test_short_series_fails_in_decomposition() {
    let orchestrator = orchestrator();
    let series: Vec<f64> = (0..10).map(|i| i as f64).collect();

    let err = orchestrator
        .generate_forecast(&series, &quick_training())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Decomposition));
    assert!(matches!(err.model_error(), Some(ModelError::InsufficientData(_))));
    assert!(std::error::Error::source(&err).is_some());
}

#[tokio::test]
async fn test_lag_window_longer_than_history_fails() {
    // Long enough to decompose with period 4, too short for 30-wide windows
    let config = InsightsConfig::default().with_period(4).with_lag_window(30);
    let orchestrator = InsightsOrchestrator::new(config).unwrap();

    let err = orchestrator
        .generate_forecast(&seasonal_series(20), &quick_training())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::FeatureConstruction));
    assert!(matches!(err.model_error(), Some(ModelError::InsufficientData(_))));
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(6)]
#[tokio::test]
async fn test_horizon_controls_prediction_count(#[case] horizon: usize) {
    let config = InsightsConfig::default().with_horizon(horizon);
    let orchestrator = InsightsOrchestrator::new(config).unwrap();

    let insights = orchestrator
        .generate_forecast(&seasonal_series(36), &quick_training())
        .await
        .unwrap();

    assert_eq!(insights.predictions.len(), horizon);
    assert!(insights.predictions.iter().all(|p| p.is_finite()));
}

#[tokio::test]
async fn test_same_seed_same_forecast() {
    let series = seasonal_series(36);
    let config = InsightsConfig::default().with_seed(9).with_horizon(2);

    let first = InsightsOrchestrator::new(config)
        .unwrap()
        .generate_forecast(&series, &quick_training())
        .await
        .unwrap();
    let second = InsightsOrchestrator::new(config)
        .unwrap()
        .generate_forecast(&series, &quick_training())
        .await
        .unwrap();

    assert_eq!(first.predictions, second.predictions);
    assert_eq!(first.metrics, second.metrics);
}

#[tokio::test]
async fn test_forecast_reuses_trained_model() {
    let orchestrator = orchestrator();
    let series = seasonal_series(36);

    let insights = orchestrator
        .generate_forecast(&series, &quick_training())
        .await
        .unwrap();
    let again = orchestrator.forecast(&series).await.unwrap();

    assert_eq!(again, insights.predictions);
}

#[tokio::test]
async fn test_forecast_before_training_fails() {
    let orchestrator = orchestrator();

    let err = orchestrator.forecast(&seasonal_series(24)).await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Forecasting));
    assert!(matches!(err.model_error(), Some(ModelError::ModelNotTrained)));
}

#[tokio::test]
async fn test_invalid_training_config_is_reported() {
    let orchestrator = orchestrator();
    let training = TrainingConfig::default().with_learning_rate(-1.0);

    let err = orchestrator
        .generate_forecast(&seasonal_series(36), &training)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Forecasting));
}

#[tokio::test]
async fn test_anomaly_report_flags_the_outlier() {
    let mut rows: Vec<Vec<f64>> = (0..48)
        .map(|k| {
            let angle = 2.0 * std::f64::consts::PI * k as f64 / 48.0;
            vec![0.5 + 0.01 * angle.cos(), 0.5 + 0.01 * angle.sin()]
        })
        .collect();
    rows.push(vec![0.99, 0.01]);
    let records = FeatureMatrix::from_rows(&rows).unwrap();
    let training = TrainingConfig::default()
        .with_epochs(40)
        .with_learning_rate(0.005)
        .with_validation_split(0.0);

    let orchestrator = InsightsOrchestrator::new(InsightsConfig::default().with_seed(17)).unwrap();
    let report = orchestrator
        .generate_anomaly_report(&records, &training)
        .await
        .unwrap();

    assert_eq!(report.anomaly_count(), 1);
    assert!(report.anomalies[48]);
    assert_eq!(report.scores.len(), 49);

    // Later scoring reuses the threshold from training
    let rescored = orchestrator.score_anomalies(&records).await.unwrap();
    assert_eq!(rescored.threshold, report.threshold);
    assert_eq!(rescored.anomalies, report.anomalies);
}

#[tokio::test]
async fn test_anomaly_scoring_before_training_fails() {
    let orchestrator = orchestrator();
    let records = FeatureMatrix::from_rows(&[vec![0.1, 0.2]]).unwrap();

    let err = orchestrator.score_anomalies(&records).await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::AnomalyDetection));
    assert!(matches!(err.model_error(), Some(ModelError::ModelNotTrained)));
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let result = InsightsOrchestrator::new(InsightsConfig::default().with_period(0));
    assert!(matches!(result, Err(InsightsError::InvalidConfig(_))));

    let result = InsightsOrchestrator::new(InsightsConfig::default().with_fence_multiplier(-2.0));
    assert!(matches!(result, Err(InsightsError::InvalidConfig(_))));
}
