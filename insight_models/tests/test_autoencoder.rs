use insight_models::{
    AutoencoderAnomalyDetector, FeatureMatrix, InsightModel, ModelError, ModelPhase,
    TrainingConfig,
};
use series_math::stats::outlier_fence;

/// Points on a small ring around (0.5, 0.5) followed by one far outlier
fn clustered_with_outlier() -> FeatureMatrix {
    let mut rows: Vec<Vec<f64>> = (0..48)
        .map(|k| {
            let angle = 2.0 * std::f64::consts::PI * k as f64 / 48.0;
            vec![0.5 + 0.01 * angle.cos(), 0.5 + 0.01 * angle.sin()]
        })
        .collect();
    rows.push(vec![0.99, 0.01]);
    FeatureMatrix::from_rows(&rows).unwrap()
}

fn config() -> TrainingConfig {
    TrainingConfig::default()
        .with_epochs(40)
        .with_learning_rate(0.005)
        .with_validation_split(0.0)
}

#[test]
fn test_only_the_outlier_is_flagged() {
    let data = clustered_with_outlier();
    let mut detector = AutoencoderAnomalyDetector::with_seed(17);
    detector.train(&data, &config()).unwrap();

    let flags = detector.detect(&data).unwrap();

    assert_eq!(flags.len(), 49);
    assert!(flags[48]);
    assert_eq!(flags.iter().filter(|&&f| f).count(), 1);
}

#[test]
fn test_scores_are_non_negative_and_match_threshold() {
    let data = clustered_with_outlier();
    let mut detector = AutoencoderAnomalyDetector::with_seed(17);
    detector.train(&data, &config()).unwrap();

    let scores = detector.scores(&data).unwrap();
    assert!(scores.iter().all(|s| *s >= 0.0));

    // The cached threshold is the fence of the training-set errors
    let expected = outlier_fence(&scores, 1.5).unwrap();
    assert_eq!(detector.threshold(), Some(expected));

    let detection = detector.evaluate(&data).unwrap();
    assert_eq!(detection.scores, scores);
    assert_eq!(detection.threshold, expected);
}

#[test]
fn test_larger_fence_never_flags_more() {
    let data = clustered_with_outlier();

    let mut tight = AutoencoderAnomalyDetector::with_seed(5);
    let mut loose = AutoencoderAnomalyDetector::with_seed(5)
        .with_fence_multiplier(3.0)
        .unwrap();
    tight.train(&data, &config()).unwrap();
    loose.train(&data, &config()).unwrap();

    let tight_result = tight.evaluate(&data).unwrap();
    let loose_result = loose.evaluate(&data).unwrap();

    assert!(loose_result.threshold >= tight_result.threshold);
    assert!(loose_result.anomaly_count() <= tight_result.anomaly_count());
}

#[test]
fn test_detect_before_training_fails() {
    let data = clustered_with_outlier();
    let detector = AutoencoderAnomalyDetector::new();

    assert!(matches!(
        detector.detect(&data),
        Err(ModelError::ModelNotTrained)
    ));
    assert!(matches!(
        detector.scores(&data),
        Err(ModelError::ModelNotTrained)
    ));
    assert_eq!(detector.threshold(), None);
}

#[test]
fn test_record_width_is_fixed_after_training() {
    let data = clustered_with_outlier();
    let mut detector = AutoencoderAnomalyDetector::new();
    detector.train(&data, &config()).unwrap();

    let wider = FeatureMatrix::from_rows(&[[0.5, 0.5, 0.5]]).unwrap();
    assert!(matches!(
        detector.scores(&wider),
        Err(ModelError::DimensionMismatch {
            expected: 2,
            actual: 3
        })
    ));
    assert!(matches!(
        detector.train(&wider, &config()),
        Err(ModelError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_encode_returns_latent_rows() {
    let data = clustered_with_outlier();
    let mut detector = AutoencoderAnomalyDetector::new();
    detector.train(&data, &config()).unwrap();

    let latent = detector.encode(&data).unwrap();
    assert_eq!(latent.rows(), data.rows());
    assert_eq!(latent.width(), 1);
}

#[test]
fn test_release_clears_threshold() {
    let data = clustered_with_outlier();
    let mut detector = AutoencoderAnomalyDetector::new();
    detector.train(&data, &config()).unwrap();

    detector.release();

    assert_eq!(detector.phase(), ModelPhase::Released);
    assert_eq!(detector.threshold(), None);
    assert!(matches!(
        detector.detect(&data),
        Err(ModelError::ModelReleased)
    ));
}

#[test]
fn test_failed_first_training_changes_nothing() {
    let data = clustered_with_outlier();
    let mut detector = AutoencoderAnomalyDetector::new();

    assert!(matches!(
        detector.train(&data, &config().with_learning_rate(0.0)),
        Err(ModelError::InvalidParameter(_))
    ));
    assert_eq!(detector.phase(), ModelPhase::Uninitialized);
    assert_eq!(detector.feature_dim(), None);
    assert_eq!(detector.threshold(), None);

    let wider = FeatureMatrix::from_rows(&[[0.2, 0.4, 0.6], [0.3, 0.5, 0.7], [0.25, 0.45, 0.65]])
        .unwrap();
    detector.train(&wider, &config()).unwrap();
    assert_eq!(detector.feature_dim(), Some(3));
    assert!(detector.threshold().is_some());
}
