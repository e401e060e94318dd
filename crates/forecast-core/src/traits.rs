use async_trait::async_trait;

use crate::error::PipelineResult;
use crate::types::ForecastResult;

/// A price forecaster: anything that can extend a closing-price history by
/// `horizon` future steps. Implementations may be pure local math or remote
/// calls into a model service; callers treat the latency as opaque.
#[async_trait]
pub trait Forecaster: Send + Sync {
    /// Identifier reported on results produced by this model.
    fn name(&self) -> &str;

    /// Predict `horizon` future prices from an ascending, gap-free history.
    async fn predict(&self, prices: &[f64], horizon: usize) -> PipelineResult<ForecastResult>;
}
