//! Error types for the insight_models crate

use series_math::MathError;
use thiserror::Error;

/// Custom error types for the insight_models crate
#[derive(Debug, Error)]
pub enum ModelError {
    /// Input shorter than the minimum needed for the operation
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Feature width disagrees with the width the model was built for
    #[error("Dimension mismatch: expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Prediction or detection attempted before a successful training run
    #[error("Model has not been trained")]
    ModelNotTrained,

    /// The optimization step itself failed
    #[error("Training failed: {0}")]
    TrainingFailed(String),

    /// The model's resources were already released
    #[error("Model resources have been released")]
    ModelReleased,

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error related to input validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error storing or restoring a model blob
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Error encoding or decoding a model blob
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from series math helpers
    #[error("Math error: {0}")]
    Math(MathError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ModelError>;

impl From<MathError> for ModelError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::InsufficientData(msg) => ModelError::InsufficientData(msg),
            other => ModelError::Math(other),
        }
    }
}
