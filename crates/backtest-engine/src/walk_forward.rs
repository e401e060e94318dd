use tracing::{debug, warn};

use accuracy_metrics::evaluate;
use forecast_core::{Forecaster, PipelineError, PipelineResult};

use crate::models::{BacktestMetrics, WalkForwardConfig};

/// Rolling-window validator: a fixed-size training window slides forward by
/// `horizon` each step, so every forecast is made from freshly "retrained"
/// context the way a production scheduler would re-fit before predicting.
/// More realistic for long horizons than a single train/test split.
pub struct WalkForwardValidator {
    config: WalkForwardConfig,
}

impl WalkForwardValidator {
    pub fn new(config: WalkForwardConfig) -> Self {
        Self { config }
    }

    pub async fn run(
        &self,
        model: &dyn Forecaster,
        prices: &[f64],
    ) -> PipelineResult<BacktestMetrics> {
        self.config.validate()?;
        let window = self.config.window_size;
        let horizon = self.config.horizon;

        let mut predicted: Vec<f64> = Vec::new();
        let mut actuals: Vec<f64> = Vec::new();
        let mut fallback_steps = 0usize;

        let mut start = 0;
        while start + window + horizon <= prices.len() {
            let train = &prices[start..start + window];
            let actual = prices[start + window + horizon - 1];

            let point = match model.predict(train, horizon).await {
                Ok(forecast) => forecast.final_prediction(),
                Err(e) => {
                    warn!(
                        "walk-forward step failed for {} at {}: {}; carrying last price",
                        model.name(),
                        start,
                        e
                    );
                    None
                }
            };
            let point = match point {
                Some(p) => p,
                None => {
                    fallback_steps += 1;
                    train[window - 1]
                }
            };

            predicted.push(point);
            actuals.push(actual);
            start += horizon;
        }

        if predicted.is_empty() {
            // Zero windows fit the series.
            return Err(PipelineError::NoPredictions);
        }

        let report = evaluate(&predicted, &actuals)?;
        debug!(
            "walk-forward {} on {} {}: mae={:.4} over {} windows ({} fallbacks)",
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
