//! Forecast a seasonal series, flag outliers and score engagement.
//!
//! Run with: cargo run --example insights_demo

use nyxs_owl_workspace::insight_models::{FeatureMatrix, MemoryStore, ModelStore};
use nyxs_owl_workspace::{InsightsConfig, InsightsOrchestrator, TrainingConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let orchestrator = InsightsOrchestrator::new(InsightsConfig::default().with_horizon(3))?;

    // Three years of monthly sessions with a summer peak
    let sessions: Vec<f64> = (0..36)
        .map(|i| {
            let season = 20.0 * (2.0 * std::f64::consts::PI * (i % 12) as f64 / 12.0).sin();
            120.0 + 1.5 * i as f64 + season
        })
        .collect();

    let training = TrainingConfig::default().with_epochs(30).with_learning_rate(0.005);
    let insights = orchestrator.generate_forecast(&sessions, &training).await?;
    println!("Next three months: {:?}", insights.predictions);
    println!("Confidence: {:.2}", insights.confidence);
    println!("Seasonal pattern: {:?}", insights.decomposition.pattern());

    let mut usage: Vec<Vec<f64>> = (0..40)
        .map(|i| vec![0.45 + 0.002 * (i % 10) as f64, 0.55 - 0.002 * (i % 7) as f64])
        .collect();
    usage.push(vec![0.98, 0.03]);
    let records = FeatureMatrix::from_rows(&usage)?;

    let report = orchestrator
        .generate_anomaly_report(&records, &training.with_validation_split(0.0))
        .await?;
    println!(
        "{} anomalous record(s), threshold {:.5}",
        report.anomaly_count(),
        report.threshold
    );

    let engagement = [
        [0.9, 0.8, 0.7, 0.9],
        [0.1, 0.2, 0.1, 0.3],
        [0.8, 0.9, 0.8, 0.7],
        [0.2, 0.1, 0.3, 0.2],
    ];
    let labels = [1.0, 0.0, 1.0, 0.0];
    orchestrator
        .train_engagement(&engagement, &labels, &training.with_validation_split(0.0))
        .await?;
    println!(
        "Engagement: {:?}",
        orchestrator.score_engagement(&engagement).await?
    );

    let store: Arc<dyn ModelStore> = Arc::new(MemoryStore::new());
    orchestrator.save_forecaster(Arc::clone(&store), "sessions").await?;
    println!("Forecaster saved: {}", store.contains("sessions")?);

    orchestrator.dispose().await?;
    Ok(())
}
