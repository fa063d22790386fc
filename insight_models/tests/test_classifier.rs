use insight_models::{
    EngagementClassifier, EngagementFeatures, FeatureMatrix, InsightModel, ModelError,
    ModelPhase, TrainingConfig,
};

fn engagement_records() -> (Vec<EngagementFeatures>, Vec<f64>) {
    let records: Vec<EngagementFeatures> = (0..40)
        .map(|i| {
            let activity = i as f64 / 40.0;
            [activity, 0.5, 0.2 + 0.01 * (i % 5) as f64, 0.1]
        })
        .collect();
    let labels = records
        .iter()
        .map(|r| if r[0] >= 0.5 { 1.0 } else { 0.0 })
        .collect();
    (records, labels)
}

fn config() -> TrainingConfig {
    TrainingConfig::default()
        .with_epochs(60)
        .with_learning_rate(0.02)
        .with_batch_size(8)
}

#[test]
fn test_training_reports_accuracy() {
    let (records, labels) = engagement_records();
    let features = EngagementClassifier::feature_matrix(&records).unwrap();
    let mut model = EngagementClassifier::with_seed(21);

    let metrics = model.train(&features, &labels, &config()).unwrap();

    let accuracy = metrics.accuracy.unwrap();
    assert!((0.0..=1.0).contains(&accuracy));
    let validation_accuracy = metrics.validation_accuracy.unwrap();
    assert!((0.0..=1.0).contains(&validation_accuracy));
    assert!(metrics.loss < metrics.loss_history[0]);

    let probabilities = model.predict(&features).unwrap();
    assert_eq!(probabilities.len(), records.len());
    assert!(probabilities.iter().all(|p| (0.0..=1.0).contains(p)));

    let classes = model.classify(&features).unwrap();
    assert_eq!(classes.len(), records.len());
}

#[test]
fn test_no_validation_accuracy_without_held_out_rows() {
    let (records, labels) = engagement_records();
    let features = EngagementClassifier::feature_matrix(&records).unwrap();
    let mut model = EngagementClassifier::new();

    let metrics = model
        .train(&features, &labels, &config().with_validation_split(0.0))
        .unwrap();

    assert!(metrics.accuracy.is_some());
    assert!(metrics.validation_accuracy.is_none());
}

#[test]
fn test_labels_must_be_binary() {
    let (records, mut labels) = engagement_records();
    labels[3] = 0.7;
    let features = EngagementClassifier::feature_matrix(&records).unwrap();
    let mut model = EngagementClassifier::new();

    assert!(matches!(
        model.train(&features, &labels, &config()),
        Err(ModelError::ValidationError(_))
    ));
}

#[test]
fn test_wrong_feature_width_rejected() {
    let features = FeatureMatrix::from_rows(&[[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]).unwrap();
    let mut model = EngagementClassifier::new();

    assert!(matches!(
        model.train(&features, &[0.0, 1.0], &config()),
        Err(ModelError::DimensionMismatch {
            expected: 4,
            actual: 3
        })
    ));
}

#[test]
fn test_predict_before_training_fails() {
    let (records, _) = engagement_records();
    let features = EngagementClassifier::feature_matrix(&records).unwrap();

    let mut model = EngagementClassifier::new();
    model.initialize().unwrap();
    assert_eq!(model.phase(), ModelPhase::Initialized);
    assert!(matches!(
        model.predict(&features),
        Err(ModelError::ModelNotTrained)
    ));
}

#[test]
fn test_rejected_training_leaves_model_uninitialized() {
    let (records, mut labels) = engagement_records();
    let features = EngagementClassifier::feature_matrix(&records).unwrap();
    let mut model = EngagementClassifier::new();

    assert!(matches!(
        model.train(&features, &labels, &config().with_batch_size(0)),
        Err(ModelError::InvalidParameter(_))
    ));
    assert_eq!(model.phase(), ModelPhase::Uninitialized);

    labels[0] = 2.0;
    assert!(matches!(
        model.train(&features, &labels, &config()),
        Err(ModelError::ValidationError(_))
    ));
    assert_eq!(model.phase(), ModelPhase::Uninitialized);
}
