//! Mini-batch training loop shared by every model

use super::loss::{binary_accuracy, Loss};
use super::network::Sequential;
use super::optimizer::Adam;
use crate::data::{FeatureMatrix, ModelMetrics, TrainingConfig};
use crate::error::{ModelError, Result};
use ndarray::{ArrayView2, Axis};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// Fit `network` to `targets` in place.
///
/// The trailing `validation_split` fraction of rows never reaches the
/// optimizer; it is only used to report the validation metrics.
pub fn fit<R: Rng + ?Sized>(
    network: &mut Sequential,
    features: &FeatureMatrix,
    targets: ArrayView2<'_, f64>,
    loss: Loss,
    config: &TrainingConfig,
    rng: &mut R,
) -> Result<ModelMetrics> {
    config.validate()?;

    if targets.nrows() != features.rows() {
        return Err(ModelError::ValidationError(format!(
            "Got {} feature rows but {} targets",
            features.rows(),
            targets.nrows()
        )));
    }
    if targets.ncols() != network.output_dim() {
        return Err(ModelError::DimensionMismatch {
            expected: network.output_dim(),
            actual: targets.ncols(),
        });
    }

    let held_out = config.validation_rows(features.rows());
    let (train_x, val_x) = features.split_tail(held_out);
    let (train_y, val_y) = targets.split_at(Axis(0), features.rows() - held_out);

    let mut optimizer = Adam::new(network, config.learning_rate);
    let batch_size = config.effective_batch_size();
    let mut order: Vec<usize> = (0..train_x.nrows()).collect();
    let mut history = Vec::with_capacity(config.epochs);

    for epoch in 1..=config.epochs {
        order.shuffle(rng);
        let mut epoch_loss = 0.0;

        for batch in order.chunks(batch_size) {
            let batch_x = train_x.select(Axis(0), batch);
            let batch_y = train_y.select(Axis(0), batch);

            let (output, grads) = network.gradients(batch_x.view(), rng, |out| {
                loss.gradient(out, batch_y.view())
            })?;
            epoch_loss += loss.value(output.view(), batch_y.view()) * batch.len() as f64;

            optimizer.apply(network, &grads)?;
        }

        epoch_loss /= train_x.nrows() as f64;
        if !epoch_loss.is_finite() {
            return Err(ModelError::TrainingFailed(format!(
                "Loss became non-finite at epoch {}",
                epoch
            )));
        }

        debug!(epoch, loss = epoch_loss, "epoch complete");
        history.push(epoch_loss);
    }

    // With nothing held out, validation falls back to the training rows
    let (eval_x, eval_y) = if held_out > 0 {
        (val_x, val_y)
    } else {
        (train_x, train_y)
    };
    let eval_output = network.predict(eval_x)?;
    let validation_loss = loss.value(eval_output.view(), eval_y);
    if !validation_loss.is_finite() {
        return Err(ModelError::TrainingFailed(
            "Validation loss is non-finite".to_string(),
        ));
    }

    let (accuracy, validation_accuracy) = if loss.reports_accuracy() {
        let train_output = network.predict(train_x)?;
        let accuracy = binary_accuracy(train_output.view(), train_y);
        let validation_accuracy =
            (held_out > 0).then(|| binary_accuracy(eval_output.view(), eval_y));
        (Some(accuracy), validation_accuracy)
    } else {
        (None, None)
    };

    Ok(ModelMetrics {
        loss: history.last().copied().unwrap_or_default(),
        validation_loss,
        accuracy,
        validation_accuracy,
        epochs: config.epochs,
        loss_history: history,
    })
}
