use tracing::{info, warn};

use forecast_core::{ModelRegistry, PipelineError, PipelineResult};

use crate::engine::Backtester;
use crate::models::{BacktestConfig, ModelComparison};

/// Runs the same backtest for several candidate models on the same data and
/// ranks the results by MAE. One broken model never aborts comparison of
/// the others; `best_model` is `None` only when every candidate failed.
pub struct ModelComparator<'a> {
    registry: &'a ModelRegistry,
}

impl<'a> ModelComparator<'a> {
    pub fn new(registry: &'a ModelRegistry) -> Self {
        Self { registry }
    }

    /// Compare an explicit candidate list.
    pub async fn compare(
        &self,
        config: &BacktestConfig,
        prices: &[f64],
        candidates: &[String],
    ) -> PipelineResult<ModelComparison> {
        config.validate()?;
        let backtester = Backtester::new(config.clone());
        let mut comparison = ModelComparison::new(&config.symbol, &config.interval);

        for name in candidates {
            let model = match self.registry.create(name) {
                Ok(model) => model,
                Err(e) => {
                    warn!("skipping {}: {}", name, e);
                    continue;
                }
            };
            match backtester.run(model.as_ref(), prices).await {
                Ok(metrics) => comparison.push(metrics),
                Err(e) => warn!("backtest failed for {}: {}, skipping", name, e),
            }
        }

        info!(
            "compared {} of {} candidates for {} {}; best: {:?}",
            comparison.results.len(),
            candidates.len(),
            config.symbol,
            config.interval,
            comparison.best_model
        );
        Ok(comparison)
    }

    /// Compare every model the registry currently reports as available.
    pub async fn compare_available(
        &self,
        config: &BacktestConfig,
        prices: &[f64],
    ) -> PipelineResult<ModelComparison> {
        if self.registry.is_empty() {
            return Err(PipelineError::NoModelsAvailable);
        }
        let candidates = self.registry.available_models();
        self.compare(config, prices, &candidates).await
    }
}
