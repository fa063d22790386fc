//! Error types for the nyxs_insights crate

use insight_models::ModelError;
use std::fmt;
use thiserror::Error;

/// Step of the insights pipeline an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decomposition,
    FeatureConstruction,
    Forecasting,
    AnomalyDetection,
    Engagement,
    Persistence,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decomposition => "decomposition",
            Stage::FeatureConstruction => "feature construction",
            Stage::Forecasting => "forecasting",
            Stage::AnomalyDetection => "anomaly detection",
            Stage::Engagement => "engagement scoring",
            Stage::Persistence => "persistence",
        };
        write!(f, "{}", name)
    }
}

/// Orchestrator-level error
#[derive(Debug, Error)]
pub enum InsightsError {
    /// A component failed; `source` is the original cause
    #[error("{stage} failed: {source}")]
    Component {
        stage: Stage,
        #[source]
        source: ModelError,
    },

    /// The blocking task running a model call panicked or was aborted
    #[error("Model task failed: {0}")]
    TaskFailed(String),

    /// The insights configuration is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl InsightsError {
    /// Pipeline step that failed, for component errors
    pub fn stage(&self) -> Option<Stage> {
        match self {
            InsightsError::Component { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Originating component error, if any
    pub fn model_error(&self) -> Option<&ModelError> {
        match self {
            InsightsError::Component { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, InsightsError>;

/// Tag a component result with the pipeline step it belongs to
pub(crate) trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T>;
}

impl<T, E> AtStage<T> for std::result::Result<T, E>
where
    E: Into<ModelError>,
{
    fn at(self, stage: Stage) -> Result<T> {
        self.map_err(|err| InsightsError::Component {
            stage,
            source: err.into(),
        })
    }
}
