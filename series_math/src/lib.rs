//! # Series Math
//!
//! Numeric building blocks for the insights pipeline.
//! This crate holds everything that has no learned state: seasonal
//! decomposition of a series and the descriptive statistics used to derive
//! thresholds and confidence scores.

use thiserror::Error;

pub mod decomposition;
pub mod stats;

pub use decomposition::{decompose, Decomposition};

/// Errors that can occur in series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;
