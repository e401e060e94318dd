pub mod weights;

pub use weights::renormalize;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use forecast_core::{
    Direction, ForecastResult, Forecaster, ModelRegistry, PipelineError, PipelineResult,
};

struct Member {
    name: String,
    weight: f64,
    /// None when the model failed to construct; the slot keeps its name so
    /// weight bookkeeping still covers the full configuration.
    model: Option<Box<dyn Forecaster>>,
}

/// Weighted ensemble over several forecasters.
///
/// `predict` fans out one call per usable model concurrently, drops the
/// failures, and weight-averages the survivors per index (predictions and
/// both confidence bands), with weights renormalized over the surviving
/// subset. The reported model identifier lists every contributor.
pub struct EnsembleForecaster {
    members: Vec<Member>,
}

impl EnsembleForecaster {
    /// Equal-weighted ensemble over the given models.
    pub fn new(models: Vec<Box<dyn Forecaster>>) -> PipelineResult<Self> {
        if models.is_empty() {
            return Err(PipelineError::NoModelsAvailable);
        }
        let weight = 1.0 / models.len() as f64;
        Ok(Self {
            members: models
                .into_iter()
                .map(|model| Member {
                    name: model.name().to_string(),
                    weight,
                    model: Some(model),
                })
                .collect(),
        })
    }

    /// Build from registry entries with configured weights. A model that
    /// fails to construct is zeroed out and its weight redistributed across
    /// the rest; if every model fails, equal weighting is restored.
    pub fn from_registry(
        registry: &ModelRegistry,
        weighted: &[(String, f64)],
    ) -> PipelineResult<Self> {
        if weighted.is_empty() {
            return Err(PipelineError::NoModelsAvailable);
        }

        let mut configured: HashMap<String, f64> = HashMap::new();
        let mut failed: HashSet<String> = HashSet::new();
        let mut models: HashMap<String, Box<dyn Forecaster>> = HashMap::new();

        for (name, weight) in weighted {
            if *weight < 0.0 {
                return Err(PipelineError::InvalidWeights(format!(
                    "negative weight {} for {}",
                    weight, name
                )));
            }
            configured.insert(name.clone(), *weight);
            match registry.create(name) {
                Ok(model) => {
                    models.insert(name.clone(), model);
                }
                Err(e) => {
                    warn!("ensemble member {} unavailable: {}", name, e);
                    failed.insert(name.clone());
                }
            }
        }

        let normalized = renormalize(&configured, &failed);
        let members = weighted
            .iter()
            .map(|(name, _)| Member {
                name: name.clone(),
                weight: normalized.get(name).copied().unwrap_or(0.0),
                model: models.remove(name),
            })
            .collect();
        Ok(Self { members })
    }

    /// Replace the weight configuration. Rejects unknown model names,
    /// negative weights, and non-positive totals; names absent from the
    /// map are set to 0.
    pub fn update_weights(&mut self, weights: &HashMap<String, f64>) -> PipelineResult<()> {
        for (name, weight) in weights {
            if !self.members.iter().any(|m| m.name == *name) {
                return Err(PipelineError::UnknownModel(name.clone()));
            }
            if *weight < 0.0 {
                return Err(PipelineError::InvalidWeights(format!(
                    "negative weight {} for {}",
                    weight, name
                )));
            }
        }
        let total: f64 = weights.values().sum();
        if total <= 0.0 {
            return Err(PipelineError::InvalidWeights(format!(
                "weights sum to {}",
                total
            )));
        }

        for member in &mut self.members {
            member.weight = weights.get(&member.name).copied().unwrap_or(0.0) / total;
        }
        Ok(())
    }

    /// Current weight per configured member.
    pub fn weights(&self) -> HashMap<String, f64> {
        self.members
            .iter()
            .map(|m| (m.name.clone(), m.weight))
            .collect()
    }
}

#[async_trait]
impl Forecaster for EnsembleForecaster {
    fn name(&self) -> &str {
        "ensemble"
    }

    async fn predict(&self, prices: &[f64], horizon: usize) -> PipelineResult<ForecastResult> {
        if horizon == 0 {
            return Err(PipelineError::InvalidForecast(
                "horizon must be positive".to_string(),
            ));
        }

        let active: Vec<(&str, f64, &dyn Forecaster)> = self
            .members
            .iter()
            .filter(|m| m.weight > 0.0)
            .filter_map(|m| m.model.as_deref().map(|model| (m.name.as_str(), m.weight, model)))
            .collect();
        if active.is_empty() {
            return Err(PipelineError::AllModelsFailed);
        }

        let calls = active.iter().map(|(name, weight, model)| async move {
            (*name, *weight, model.predict(prices, horizon).await)
        });
        let results = join_all(calls).await;

        let mut surviving: Vec<(&str, f64, ForecastResult)> = Vec::new();
        for (name, weight, result) in results {
            match result {
                Ok(forecast)
                    if forecast.predictions.len() == horizon
                        && forecast.confidence_low.len() == horizon
                        && forecast.confidence_high.len() == horizon =>
                {
                    surviving.push((name, weight, forecast));
                }
                Ok(forecast) => warn!(
                    "ensemble member {} returned {} predictions for horizon {}, dropping",
                    name,
                    forecast.predictions.len(),
                    horizon
                ),
                Err(e) => warn!("ensemble member {} failed: {}", name, e),
            }
        }
        if surviving.is_empty() {
            return Err(PipelineError::AllModelsFailed);
        }

        // Renormalize over just the survivors.
        let total: f64 = surviving.iter().map(|(_, weight, _)| weight).sum();
        let mut predictions = vec![0.0; horizon];
        let mut confidence_low = vec![0.0; horizon];
        let mut confidence_high = vec![0.0; horizon];
        let mut confidence_pct = 0.0;
        for (_, weight, forecast) in &surviving {
            let w = weight / total;
            for i in 0..horizon {
                predictions[i] += w * forecast.predictions[i];
                confidence_low[i] += w * forecast.confidence_low[i];
                confidence_high[i] += w * forecast.confidence_high[i];
            }
            confidence_pct += w * forecast.confidence_pct;
        }

        let direction = match prices.last() {
            Some(&last) => Direction::classify(last, predictions[horizon - 1]),
            None => Direction::Neutral,
        };
        let contributors: Vec<&str> = surviving.iter().map(|(name, _, _)| *name).collect();
        let model = format!("ensemble({})", contributors.join("+"));
        debug!(
            "{} combined {} of {} members",
            model,
            surviving.len(),
            active.len()
        );

        ForecastResult::try_new(
            model,
            predictions,
            confidence_low,
            confidence_high,
            direction,
            confidence_pct.clamp(0.0, 100.0),
        )
    }
}
