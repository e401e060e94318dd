use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use accuracy_metrics::AccuracyReport;
use forecast_core::{
    Direction, ForecastResult, Forecaster, ModelRegistry, PipelineError, PipelineResult,
};

use crate::comparator::ModelComparator;
use crate::engine::Backtester;
use crate::models::*;
use crate::optimizer::{HyperparamOptimizer, SearchSpace};
use crate::walk_forward::WalkForwardValidator;

/// Helper: ascending series 100, 101, 102, ...
fn linear_prices(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 + i as f64).collect()
}

/// Helper: config over BTC hourly candles with the given splits.
fn config(train: f64, val: f64, test: f64, horizon: usize) -> BacktestConfig {
    BacktestConfig::new("BTC", "1h")
        .with_ratios(train, val, test)
        .with_horizon(horizon)
}

/// Stub that always predicts "last context price + 1" for every horizon step.
struct OneAhead;

#[async_trait]
impl Forecaster for OneAhead {
    fn name(&self) -> &str {
        "one-ahead"
    }

    async fn predict(&self, prices: &[f64], horizon: usize) -> PipelineResult<ForecastResult> {
        let last = prices.last().copied().ok_or_else(|| {
            PipelineError::InsufficientData("empty context".to_string())
        })?;
        let predictions = vec![last + 1.0; horizon];
        ForecastResult::try_new(
            self.name(),
            predictions.clone(),
            predictions.clone(),
            predictions,
            Direction::Up,
            75.0,
        )
    }
}

/// Stub that fails every second call.
struct Flaky {
    calls: AtomicUsize,
}

impl Flaky {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Forecaster for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn predict(&self, prices: &[f64], horizon: usize) -> PipelineResult<ForecastResult> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call % 2 == 1 {
            return Err(PipelineError::Model("simulated outage".to_string()));
        }
        let last = prices.last().copied().ok_or_else(|| {
            PipelineError::InsufficientData("empty context".to_string())
        })?;
        let predictions = vec![last + 1.0; horizon];
        ForecastResult::try_new(
            self.name(),
            predictions.clone(),
            predictions.clone(),
            predictions,
            Direction::Up,
            75.0,
        )
    }
}

/// Stub predicting "last context price + bias", for optimizer tests.
struct Biased {
    bias: f64,
}

#[async_trait]
impl Forecaster for Biased {
    fn name(&self) -> &str {
        "biased"
    }

    async fn predict(&self, prices: &[f64], horizon: usize) -> PipelineResult<ForecastResult> {
        let last = prices.last().copied().ok_or_else(|| {
            PipelineError::InsufficientData("empty context".to_string())
        })?;
        let predictions = vec![last + self.bias; horizon];
        ForecastResult::try_new(
            self.name(),
            predictions.clone(),
            predictions.clone(),
            predictions,
            Direction::Up,
            50.0,
        )
    }
}

fn report(mae: f64) -> AccuracyReport {
    AccuracyReport {
        mae,
        rmse: mae,
        mape: mae,
        direction_accuracy: 50.0,
        sample_size: 10,
    }
}

// --- Single-model backtester ---

#[tokio::test]
async fn ratios_summing_far_from_one_are_rejected() {
    let prices = linear_prices(100);

    let result = Backtester::new(config(0.3, 0.1, 0.1, 5))
        .run(&OneAhead, &prices)
        .await;
    assert!(matches!(result, Err(PipelineError::InvalidRatio { .. })));

    let result = Backtester::new(config(0.5, 0.5, 0.5, 5))
        .run(&OneAhead, &prices)
        .await;
    assert!(matches!(result, Err(PipelineError::InvalidRatio { .. })));
}

#[tokio::test]
async fn ratios_within_tolerance_are_accepted() {
    let prices = linear_prices(100);

    assert!(Backtester::new(config(0.6995, 0.0, 0.3, 5))
        .run(&OneAhead, &prices)
        .await
        .is_ok());
    assert!(Backtester::new(config(0.7, 0.0, 0.3005, 5))
        .run(&OneAhead, &prices)
        .await
        .is_ok());
}

#[tokio::test]
async fn short_history_is_rejected() {
    let prices = linear_prices(30);
    let result = Backtester::new(config(0.7, 0.0, 0.3, 5))
        .run(&OneAhead, &prices)
        .await;
    assert!(matches!(result, Err(PipelineError::InsufficientData(_))));
}

#[tokio::test]
async fn test_segment_shorter_than_horizon_is_rejected() {
    let prices = linear_prices(100);
    let result = Backtester::new(config(0.98, 0.0, 0.02, 5))
        .run(&OneAhead, &prices)
        .await;
    assert!(matches!(result, Err(PipelineError::InsufficientData(_))));
}

#[tokio::test]
async fn linear_series_with_one_ahead_stub() {
    // 100 points, 70/0/30 split, horizon 5: six steps, each prediction
    // trails the true trend by the 4 steps the stub does not model.
    let prices = linear_prices(100);
    let metrics = Backtester::new(config(0.7, 0.0, 0.3, 5))
        .run(&OneAhead, &prices)
        .await
        .unwrap();

    assert_eq!(metrics.sample_size, 6);
    assert_eq!(metrics.fallback_steps, 0);
    assert_eq!(metrics.direction_accuracy, 100.0);
    assert!((metrics.mae - 4.0).abs() < 1e-9);
    assert!(metrics.mae > 0.0);
    assert_eq!(metrics.model, "one-ahead");
    assert_eq!(metrics.symbol, "BTC");
    assert_eq!(metrics.interval, "1h");
}

#[tokio::test]
async fn one_step_horizon_tracks_linear_series_exactly() {
    // With horizon 1 the stub's "+1" is exactly the next point of the
    // linear series, so the error vanishes.
    let prices = linear_prices(100);
    let metrics = Backtester::new(config(0.7, 0.0, 0.3, 1))
        .run(&OneAhead, &prices)
        .await
        .unwrap();

    assert!(metrics.mae < 1e-9);
    assert_eq!(metrics.direction_accuracy, 100.0);
    assert_eq!(metrics.sample_size, 30);
}

#[tokio::test]
async fn failed_steps_fall_back_to_last_price() {
    // Flaky fails calls 1, 3, 5 of 6; those steps carry the last context
    // price (error 5) instead of the stub's prediction (error 4).
    let prices = linear_prices(100);
    let metrics = Backtester::new(config(0.7, 0.0, 0.3, 5))
        .run(&Flaky::new(), &prices)
        .await
        .unwrap();

    assert_eq!(metrics.sample_size, 6);
    assert_eq!(metrics.fallback_steps, 3);
    assert!((metrics.mae - 4.5).abs() < 1e-9);
    assert_eq!(metrics.direction_accuracy, 100.0);
}

// --- Walk-forward validator ---

#[tokio::test]
async fn walk_forward_slides_fixed_window() {
    // 100 points, window 50, horizon 5: ten windows, same one-step lag.
    let prices = linear_prices(100);
    let validator = WalkForwardValidator::new(WalkForwardConfig::new("BTC", "1h", 50, 5));
    let metrics = validator.run(&OneAhead, &prices).await.unwrap();

    assert_eq!(metrics.sample_size, 10);
    assert!((metrics.mae - 4.0).abs() < 1e-9);
    assert_eq!(metrics.direction_accuracy, 100.0);
}

#[tokio::test]
async fn walk_forward_fails_when_no_window_fits() {
    let prices = linear_prices(20);
    let validator = WalkForwardValidator::new(WalkForwardConfig::new("BTC", "1h", 50, 5));
    let result = validator.run(&OneAhead, &prices).await;
    assert!(matches!(result, Err(PipelineError::NoPredictions)));
}

// --- Model comparator ---

fn registry_with_one_good_model() -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    registry.register("one-ahead", || Ok(Box::new(OneAhead) as Box<dyn Forecaster>));
    registry.register("broken-a", || {
        Err(PipelineError::Model("weights missing".to_string()))
    });
    registry.register("broken-b", || {
        Err(PipelineError::Model("service down".to_string()))
    });
    registry
}

#[tokio::test]
async fn comparator_keeps_the_surviving_model() {
    let registry = registry_with_one_good_model();
    let prices = linear_prices(100);
    let comparison = ModelComparator::new(&registry)
        .compare_available(&BacktestConfig::for_comparison("BTC", "1h", 0.7, 0.3).with_horizon(5), &prices)
        .await
        .unwrap();

    assert_eq!(comparison.results.len(), 1);
    assert_eq!(comparison.best_model.as_deref(), Some("one-ahead"));
}

#[tokio::test]
async fn comparator_with_all_models_broken_reports_none() {
    let mut registry = ModelRegistry::new();
    registry.register("broken-a", || {
        Err(PipelineError::Model("weights missing".to_string()))
    });
    registry.register("broken-b", || {
        Err(PipelineError::Model("service down".to_string()))
    });

    let prices = linear_prices(100);
    let comparison = ModelComparator::new(&registry)
        .compare_available(&BacktestConfig::for_comparison("BTC", "1h", 0.7, 0.3).with_horizon(5), &prices)
        .await
        .unwrap();

    assert!(comparison.results.is_empty());
    assert!(comparison.best_model.is_none());
}

#[tokio::test]
async fn comparator_on_empty_registry_is_an_error() {
    let registry = ModelRegistry::new();
    let prices = linear_prices(100);
    let result = ModelComparator::new(&registry)
        .compare_available(&BacktestConfig::for_comparison("BTC", "1h", 0.7, 0.3), &prices)
        .await;
    assert!(matches!(result, Err(PipelineError::NoModelsAvailable)));
}

#[test]
fn comparison_recomputes_best_on_every_push() {
    let mut comparison = ModelComparison::new("BTC", "1h");
    comparison.push(BacktestMetrics::from_report("drift", "BTC", "1h", &report(3.0), 0));
    assert_eq!(comparison.best_model.as_deref(), Some("drift"));

    comparison.push(BacktestMetrics::from_report("chronos", "BTC", "1h", &report(1.5), 0));
    assert_eq!(comparison.best_model.as_deref(), Some("chronos"));

    comparison.push(BacktestMetrics::from_report("naive", "BTC", "1h", &report(6.0), 0));
    assert_eq!(comparison.best_model.as_deref(), Some("chronos"));
    assert_eq!(comparison.results.len(), 3);
}

// --- Hyperparameter optimizer ---

#[tokio::test]
async fn optimizer_tracks_best_trial() {
    // mae of a `bias` stub on the linear series is exactly |bias - 5|.
    let prices = linear_prices(100);
    let space = SearchSpace::new().with_param("bias", 0.0, 8.0);
    let result = HyperparamOptimizer::new(20)
        .optimize(
            &space,
            &config(0.7, 0.0, 0.3, 5),
            &prices,
            &|params| {
                let bias = params["bias"];
                Ok(Box::new(Biased { bias }) as Box<dyn Forecaster>)
            },
        )
        .await;

    assert_eq!(result.trials.len(), 20);
    let best_score = result.best_score().unwrap();
    let best_bias = result.best_params().unwrap()["bias"];
    assert!((best_score - (best_bias - 5.0).abs()).abs() < 1e-9);
    let min_score = result
        .trials
        .iter()
        .map(|t| t.score)
        .fold(f64::INFINITY, f64::min);
    assert_eq!(best_score, min_score);
}

#[tokio::test]
async fn optimizer_scores_failed_trials_as_infinity() {
    let prices = linear_prices(100);
    let space = SearchSpace::new().with_param("bias", 0.0, 8.0);
    let result = HyperparamOptimizer::new(5)
        .optimize(&space, &config(0.7, 0.0, 0.3, 5), &prices, &|_| {
            Err(PipelineError::Model("cannot build".to_string()))
        })
        .await;

    assert_eq!(result.trials.len(), 5);
    assert!(result.trials.iter().all(|t| t.score.is_infinite() && !t.succeeded));
    assert!(result.best_params().is_none());
    assert!(result.best_score().is_none());
}

#[tokio::test]
async fn optimizer_timeout_bounds_the_search() {
    let prices = linear_prices(100);
    let space = SearchSpace::new().with_param("bias", 0.0, 8.0);
    let result = HyperparamOptimizer::new(1000)
        .with_timeout(std::time::Duration::ZERO)
        .optimize(&space, &config(0.7, 0.0, 0.3, 5), &prices, &|params| {
            let bias = params["bias"];
            Ok(Box::new(Biased { bias }) as Box<dyn Forecaster>)
        })
        .await;

    assert!(result.trials.is_empty());
}

#[tokio::test]
async fn best_params_is_readable_mid_search() {
    // A fixed-width space makes every trial identical, so the first trial
    // is already the best the search will ever see.
    let prices = linear_prices(100);
    let space = SearchSpace::new().with_param("bias", 2.0, 2.0);
    let result = HyperparamOptimizer::new(3)
        .optimize(&space, &config(0.7, 0.0, 0.3, 5), &prices, &|params| {
            let bias = params["bias"];
            Ok(Box::new(Biased { bias }) as Box<dyn Forecaster>)
        })
        .await;

    assert_eq!(result.best_params().unwrap()["bias"], 2.0);
    assert!((result.best_score().unwrap() - 3.0).abs() < 1e-9);
}
