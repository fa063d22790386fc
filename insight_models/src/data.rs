//! Feature matrices, training configuration and training metrics

use crate::error::{ModelError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Rows per mini-batch when the config leaves the batch size unset
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Rectangular matrix of feature rows.
///
/// Every model takes its inputs as a `FeatureMatrix`, so ragged or empty
/// input is rejected once, at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    values: Array2<f64>,
}

impl FeatureMatrix {
    /// Build a matrix from rows of equal, non-zero width
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let first = rows.first().ok_or_else(|| {
            ModelError::InsufficientData("Feature matrix needs at least one row".to_string())
        })?;
        let width = first.as_ref().len();
        if width == 0 {
            return Err(ModelError::InsufficientData(
                "Feature rows must have at least one column".to_string(),
            ));
        }

        let mut flat = Vec::with_capacity(rows.len() * width);
        for row in rows {
            let row = row.as_ref();
            if row.len() != width {
                return Err(ModelError::DimensionMismatch {
                    expected: width,
                    actual: row.len(),
                });
            }
            flat.extend_from_slice(row);
        }

        let values = Array2::from_shape_vec((rows.len(), width), flat)
            .map_err(|e| ModelError::ValidationError(e.to_string()))?;
        Ok(Self { values })
    }

    /// Wrap an existing array
    pub fn from_array(values: Array2<f64>) -> Result<Self> {
        if values.nrows() == 0 || values.ncols() == 0 {
            return Err(ModelError::InsufficientData(
                "Feature matrix must not be empty".to_string(),
            ));
        }
        Ok(Self { values })
    }

    /// A single feature row
    pub fn single_row(row: &[f64]) -> Result<Self> {
        Self::from_rows(&[row])
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of features per row
    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    /// Row `index`, if present
    pub fn row(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.rows()).then(|| self.values.row(index))
    }

    /// View of the underlying array
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Copy with every column scaled linearly onto `[0, 1]`.
    ///
    /// Constant columns map to zero.
    pub fn min_max_scaled(&self) -> Result<Self> {
        let mut scaled = self.values.clone();
        for mut column in scaled.axis_iter_mut(Axis(1)) {
            let values = column.to_vec();
            let normalized = series_math::stats::min_max_scale(&values)?;
            column.assign(&Array1::from(normalized));
        }
        Ok(Self { values: scaled })
    }

    /// Split into the leading `rows - tail` rows and the trailing `tail` rows
    pub(crate) fn split_tail(&self, tail: usize) -> (ArrayView2<'_, f64>, ArrayView2<'_, f64>) {
        self.values.view().split_at(Axis(0), self.rows() - tail)
    }
}

/// Training hyperparameters, overridable per call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Passes over the training rows
    pub epochs: usize,
    /// Adam step size
    pub learning_rate: f64,
    /// Fraction of trailing rows held out for validation, in `[0, 1)`
    pub validation_split: f64,
    /// Rows per mini-batch; `None` means [`DEFAULT_BATCH_SIZE`]
    pub batch_size: Option<usize>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            learning_rate: 0.01,
            validation_split: 0.2,
            batch_size: None,
        }
    }
}

impl TrainingConfig {
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_validation_split(mut self, validation_split: f64) -> Self {
        self.validation_split = validation_split;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Check every field is in range
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(ModelError::InvalidParameter(
                "Epochs must be greater than zero".to_string(),
            ));
        }

        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ModelError::InvalidParameter(format!(
                "Learning rate must be a positive finite number, got {}",
                self.learning_rate
            )));
        }

        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(ModelError::InvalidParameter(format!(
                "Validation split must be in [0, 1), got {}",
                self.validation_split
            )));
        }

        if self.batch_size == Some(0) {
            return Err(ModelError::InvalidParameter(
                "Batch size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Effective mini-batch size
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    /// Rows held out for validation out of `rows`, always leaving one for training
    pub fn validation_rows(&self, rows: usize) -> usize {
        let held_out = (rows as f64 * self.validation_split).floor() as usize;
        held_out.min(rows.saturating_sub(1))
    }
}

/// Final-epoch metrics of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Training loss of the final epoch
    pub loss: f64,
    /// Loss on the held-out rows (training rows when none are held out)
    pub validation_loss: f64,
    /// Training accuracy, classifiers only
    pub accuracy: Option<f64>,
    /// Held-out accuracy, classifiers only
    pub validation_accuracy: Option<f64>,
    /// Number of epochs run
    pub epochs: usize,
    /// Training loss of every epoch, in order
    pub loss_history: Vec<f64>,
}
