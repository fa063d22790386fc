//! Lag-window feature construction

use insight_models::{FeatureMatrix, ModelError, Result};

/// Slide a window of `width` observations over `series`.
///
/// Row `k` holds `series[i - width .. i]` and its label is `series[i]`,
/// for every `i >= width`. Fails when no row has a full history.
pub fn lag_windows(series: &[f64], width: usize) -> Result<(FeatureMatrix, Vec<f64>)> {
    if width == 0 {
        return Err(ModelError::InvalidParameter(
            "Lag window must be greater than zero".to_string(),
        ));
    }
    if series.len() <= width {
        return Err(ModelError::InsufficientData(format!(
            "Lag window of {} needs at least {} observations, have {}",
            width,
            width + 1,
            series.len()
        )));
    }

    let rows: Vec<&[f64]> = series.windows(width).take(series.len() - width).collect();
    let labels = series[width..].to_vec();

    Ok((FeatureMatrix::from_rows(&rows)?, labels))
}

/// The most recent `width` observations, the input for the next forecast
pub fn latest_window(series: &[f64], width: usize) -> Result<Vec<f64>> {
    if width == 0 || series.len() < width {
        return Err(ModelError::InsufficientData(format!(
            "Need {} observations for the latest window, have {}",
            width,
            series.len()
        )));
    }
    Ok(series[series.len() - width..].to_vec())
}
