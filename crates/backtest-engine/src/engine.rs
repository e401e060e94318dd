use tracing::{debug, warn};

use accuracy_metrics::evaluate;
use forecast_core::{Forecaster, PipelineError, PipelineResult};

use crate::models::{BacktestConfig, BacktestMetrics};

/// Walk-forward backtester for a single forecasting model.
///
/// Splits the history into contiguous train/val/test segments by ratio
/// (index order preserved; shuffling would leak the future), then steps
/// through the test segment in non-overlapping horizon-sized windows. Each
/// step forecasts from a bounded context of everything before its window
/// and contributes one (prediction, actual) pair: the final predicted point
/// against the final actual of the window.
pub struct Backtester {
    config: BacktestConfig,
}

impl Backtester {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub async fn run(
        &self,
        model: &dyn Forecaster,
        prices: &[f64],
    ) -> PipelineResult<BacktestMetrics> {
        self.config.validate()?;
        if prices.len() < self.config.min_training_points {
            return Err(PipelineError::InsufficientData(format!(
                "{} prices supplied, need at least {}",
                prices.len(),
                self.config.min_training_points
            )));
        }

        let n = prices.len();
        let train_len = (n as f64 * self.config.train_ratio) as usize;
        let val_len = (n as f64 * self.config.val_ratio) as usize;
        let test_start = (train_len + val_len).min(n);
        let test = &prices[test_start..];
        let horizon = self.config.horizon;
        if test.len() < horizon {
            return Err(PipelineError::InsufficientData(format!(
                "test segment has {} points, horizon needs {}",
                test.len(),
                horizon
            )));
        }

        let mut predicted: Vec<f64> = Vec::new();
        let mut actuals: Vec<f64> = Vec::new();
        let mut fallback_steps = 0usize;

        let mut offset = 0;
        while offset + horizon <= test.len() {
            let context =
                bounded_context(prices, test_start + offset, self.config.max_context_points);
            let actual = test[offset + horizon - 1];

            let point = match model.predict(context, horizon).await {
                Ok(forecast) => forecast.final_prediction(),
                Err(e) => {
                    warn!(
                        "forecast step failed for {} at offset {}: {}; carrying last price",
                        model.name(),
                        offset,
                        e
                    );
                    None
                }
            };
            let point = match point {
                Some(p) => p,
                None => match context.last().copied() {
                    Some(last) => {
                        fallback_steps += 1;
                        last
                    }
                    // No context to fall back on; the step yields no pair.
                    None => {
                        offset += horizon;
                        continue;
                    }
                },
            };

            predicted.push(point);
            actuals.push(actual);
            offset += horizon;
        }

        if predicted.is_empty() {
            return Err(PipelineError::NoPredictions);
        }

        let report = evaluate(&predicted, &actuals)?;
        debug!(
            "backtest {} on {} {}: mae={:.4} over {} steps ({} fallbacks)",
            model.name(),
            self.config.symbol,
            self.config.interval,
            report.mae,
            report.sample_size,
            fallback_steps
        );
        Ok(BacktestMetrics::from_report(
            model.name(),
            &self.config.symbol,
            &self.config.interval,
            &report,
            fallback_steps,
        ))
    }
}

/// Everything before `end`, clipped to the most recent `max_points`.
fn bounded_context(prices: &[f64], end: usize, max_points: usize) -> &[f64] {
    let start = end.saturating_sub(max_points);
    &prices[start..end]
}
