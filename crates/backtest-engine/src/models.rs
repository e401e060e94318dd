use std::cmp::Ordering;

use accuracy_metrics::AccuracyReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forecast_core::{PipelineError, PipelineResult};

/// Fewest history points a backtest will accept.
pub const MIN_TRAINING_POINTS: usize = 50;

/// Most context points shipped to a model per forecast call.
pub const MAX_CONTEXT_POINTS: usize = 512;

/// Tolerance when checking that split ratios sum to 1.0.
pub const RATIO_TOLERANCE: f64 = 0.001;

fn default_max_context() -> usize {
    MAX_CONTEXT_POINTS
}

fn default_min_training() -> usize {
    MIN_TRAINING_POINTS
}

/// Configuration for a single-model backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub symbol: String,
    pub interval: String,
    pub train_ratio: f64,
    pub val_ratio: f64,
    pub test_ratio: f64,
    /// Steps predicted per forecast call. Each walk-forward step compares
    /// only the final predicted point against the final actual of its
    /// window, so longer horizons understate intra-horizon error.
    pub horizon: usize,
    #[serde(default = "default_max_context")]
    pub max_context_points: usize,
    #[serde(default = "default_min_training")]
    pub min_training_points: usize,
}

impl BacktestConfig {
    pub fn new(symbol: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            interval: interval.into(),
            train_ratio: 0.7,
            val_ratio: 0.15,
            test_ratio: 0.15,
            horizon: 24,
            max_context_points: MAX_CONTEXT_POINTS,
            min_training_points: MIN_TRAINING_POINTS,
        }
    }

    /// Comparison-mode config: no validation split.
    pub fn for_comparison(
        symbol: impl Into<String>,
        interval: impl Into<String>,
        train_ratio: f64,
        test_ratio: f64,
    ) -> Self {
        let mut config = Self::new(symbol, interval);
        config.train_ratio = train_ratio;
        config.val_ratio = 0.0;
        config.test_ratio = test_ratio;
        config
    }

    pub fn with_ratios(mut self, train: f64, val: f64, test: f64) -> Self {
        self.train_ratio = train;
        self.val_ratio = val;
        self.test_ratio = test;
        self
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn validate(&self) -> PipelineResult<()> {
        let sum = self.train_ratio + self.val_ratio + self.test_ratio;
        if (sum - 1.0).abs() > RATIO_TOLERANCE {
            return Err(PipelineError::InvalidRatio { sum });
        }
        if self.horizon == 0 {
            return Err(PipelineError::InsufficientData(
                "horizon must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Accuracy of one model over one backtest run. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub model: String,
    pub symbol: String,
    pub interval: String,
    pub mae: f64,
    pub rmse: f64,
    /// +inf when every actual in the test segment was zero.
    pub mape: f64,
    pub direction_accuracy: f64,
    pub sample_size: usize,
    /// Steps where the model call failed and the last context price was
    /// carried forward instead. Large values mean the headline numbers
    /// mostly grade the fallback, not the model.
    pub fallback_steps: usize,
    pub created_at: DateTime<Utc>,
}

impl BacktestMetrics {
    pub fn from_report(
        model: &str,
        symbol: &str,
        interval: &str,
        report: &AccuracyReport,
        fallback_steps: usize,
    ) -> Self {
        Self {
            model: model.to_string(),
            symbol: symbol.to_string(),
            interval: interval.to_string(),
            mae: report.mae,
            rmse: report.rmse,
            mape: report.mape,
            direction_accuracy: report.direction_accuracy,
            sample_size: report.sample_size,
            fallback_steps,
            created_at: Utc::now(),
        }
    }
}

/// Accumulator for a multi-model comparison. `best_model` tracks the lowest
/// MAE seen so far and is recomputed on every insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelComparison {
    pub symbol: String,
    pub interval: String,
    pub results: Vec<BacktestMetrics>,
    pub best_model: Option<String>,
}

impl ModelComparison {
    pub fn new(symbol: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            interval: interval.into(),
            results: Vec::new(),
            best_model: None,
        }
    }

    pub fn push(&mut self, metrics: BacktestMetrics) {
        self.results.push(metrics);
        self.best_model = self.best().map(|m| m.model.clone());
    }

    /// Metrics of the lowest-MAE model, if any model produced metrics.
    pub fn best(&self) -> Option<&BacktestMetrics> {
        self.results
            .iter()
            .min_by(|a, b| a.mae.partial_cmp(&b.mae).unwrap_or(Ordering::Equal))
    }
}

/// Configuration for rolling-window walk-forward validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    pub symbol: String,
    pub interval: String,
    /// Training window length in data points, not calendar days; callers
    /// convert days with their interval's points-per-day. Gaps from
    /// irregular candle emission are not corrected for.
    pub window_size: usize,
    pub horizon: usize,
}

impl WalkForwardConfig {
    pub fn new(
        symbol: impl Into<String>,
        interval: impl Into<String>,
        window_size: usize,
        horizon: usize,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            interval: interval.into(),
            window_size,
            horizon,
        }
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.window_size == 0 {
            return Err(PipelineError::InsufficientData(
                "window_size must be at least 1".to_string(),
            ));
        }
        if self.horizon == 0 {
            return Err(PipelineError::InsufficientData(
                "horizon must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
