use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use forecast_core::{Forecaster, PipelineResult};

use crate::engine::Backtester;
use crate::models::BacktestConfig;

/// Inclusive bounds for one tunable parameter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
}

/// Model-specific search space: parameter name to sampling bounds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSpace {
    pub params: BTreeMap<String, ParamRange>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, name: impl Into<String>, min: f64, max: f64) -> Self {
        self.params.insert(name.into(), ParamRange { min, max });
        self
    }

    fn sample(&self, rng: &mut impl Rng) -> HashMap<String, f64> {
        self.params
            .iter()
            .map(|(name, range)| {
                let value = if range.max > range.min {
                    rng.gen_range(range.min..=range.max)
                } else {
                    range.min
                };
                (name.clone(), value)
            })
            .collect()
    }
}

/// One completed (or failed) optimization trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial: usize,
    pub params: HashMap<String, f64>,
    /// MAE of the trial's backtest; +inf when the trial failed.
    pub score: f64,
    pub succeeded: bool,
}

/// Full trial history plus the best configuration found so far. Readable
/// mid-search, not only after the loop ends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub trials: Vec<TrialRecord>,
    best_index: Option<usize>,
}

impl OptimizationResult {
    fn record(&mut self, trial: TrialRecord) {
        let better = match self.best_index {
            None => trial.score.is_finite(),
            Some(i) => trial.score < self.trials[i].score,
        };
        if better {
            self.best_index = Some(self.trials.len());
        }
        self.trials.push(trial);
    }

    pub fn best_params(&self) -> Option<&HashMap<String, f64>> {
        self.best_index.map(|i| &self.trials[i].params)
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best_index.map(|i| self.trials[i].score)
    }
}

/// Random-search hyperparameter optimizer scored by backtest MAE (lower is
/// better). A trial whose model fails to build or whose backtest errors is
/// scored +inf and never crashes the search.
pub struct HyperparamOptimizer {
    n_trials: usize,
    timeout: Option<Duration>,
}

impl HyperparamOptimizer {
    pub fn new(n_trials: usize) -> Self {
        Self {
            n_trials,
            timeout: None,
        }
    }

    /// Bound the whole search by wall clock. A trial already running when
    /// the deadline passes still finishes.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run up to `n_trials` trials, building a candidate model from each
    /// sampled parameter set via `build` and backtesting it on `prices`.
    pub async fn optimize(
        &self,
        space: &SearchSpace,
        config: &BacktestConfig,
        prices: &[f64],
        build: &(dyn Fn(&HashMap<String, f64>) -> PipelineResult<Box<dyn Forecaster>> + Send + Sync),
    ) -> OptimizationResult {
        let backtester = Backtester::new(config.clone());
        let started = Instant::now();
        let mut result = OptimizationResult::default();

        for trial in 0..self.n_trials {
            if let Some(limit) = self.timeout {
                if started.elapsed() >= limit {
                    info!("optimizer timeout after {} trials", trial);
                    break;
                }
            }

            let params = space.sample(&mut rand::thread_rng());
            let score = match build(&params) {
                Ok(model) => match backtester.run(model.as_ref(), prices).await {
                    Ok(metrics) => metrics.mae,
                    Err(e) => {
                        warn!("trial {} backtest failed: {}", trial, e);
                        f64::INFINITY
                    }
                },
                Err(e) => {
                    warn!("trial {} model build failed: {}", trial, e);
                    f64::INFINITY
                }
            };

            result.record(TrialRecord {
                trial,
                params,
                score,
                succeeded: score.is_finite(),
            });
        }

        result
    }
}
