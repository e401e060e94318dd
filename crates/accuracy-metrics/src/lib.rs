use forecast_core::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Forecast accuracy metrics over a paired (predicted, actual) sample.
///
/// `sample_size == 0` means the input was empty and every other field is a
/// placeholder; callers must check it before trusting the numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub mae: f64,
    pub rmse: f64,
    /// Percentage error over non-zero actuals; +inf when every actual is 0.
    pub mape: f64,
    /// Percentage of steps where the predicted move direction matched the
    /// actual move direction. 0 when fewer than two samples exist.
    pub direction_accuracy: f64,
    pub sample_size: usize,
}

impl AccuracyReport {
    fn empty() -> Self {
        Self {
            mae: f64::INFINITY,
            rmse: f64::INFINITY,
            mape: f64::INFINITY,
            direction_accuracy: 0.0,
            sample_size: 0,
        }
    }
}

/// Compute MAE, RMSE, MAPE and direction accuracy for two aligned sequences.
///
/// Mismatched lengths are a pipeline bug and fail with `LengthMismatch`.
/// Empty input returns the all-inf placeholder report rather than erroring.
pub fn evaluate(predicted: &[f64], actual: &[f64]) -> PipelineResult<AccuracyReport> {
    if predicted.len() != actual.len() {
        return Err(PipelineError::LengthMismatch {
            predicted: predicted.len(),
            actual: actual.len(),
        });
    }
    if predicted.is_empty() {
        return Ok(AccuracyReport::empty());
    }

    let abs_errors: Vec<f64> = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).abs())
        .collect();
    let mae = abs_errors.as_slice().mean();
    let rmse = abs_errors.iter().map(|e| e * e).mean().sqrt();

    let pct_errors: Vec<f64> = predicted
        .iter()
        .zip(actual)
        .filter(|(_, a)| **a != 0.0)
        .map(|(p, a)| (p - a).abs() / a.abs() * 100.0)
        .collect();
    let mape = if pct_errors.is_empty() {
        f64::INFINITY
    } else {
        pct_errors.as_slice().mean()
    };

    Ok(AccuracyReport {
        mae,
        rmse,
        mape,
        direction_accuracy: direction_accuracy(predicted, actual),
        sample_size: predicted.len(),
    })
}

/// Percentage of consecutive-difference signs that agree between the two
/// sequences. Flat moves count as their own direction.
pub fn direction_accuracy(predicted: &[f64], actual: &[f64]) -> f64 {
    if predicted.len() < 2 || predicted.len() != actual.len() {
        return 0.0;
    }
    let matches = predicted
        .windows(2)
        .zip(actual.windows(2))
        .filter(|(p, a)| sign(p[1] - p[0]) == sign(a[1] - a[0]))
        .count();
    matches as f64 / (predicted.len() - 1) as f64 * 100.0
}

fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}
