use async_trait::async_trait;
use statrs::statistics::Statistics;

use forecast_core::{Direction, ForecastResult, Forecaster, PipelineError, PipelineResult};

/// Diffs window used when estimating per-step volatility for the bands.
const VOLATILITY_LOOKBACK: usize = 20;

/// Sample standard deviation of the most recent one-step price changes.
fn step_volatility(prices: &[f64]) -> f64 {
    let start = prices.len().saturating_sub(VOLATILITY_LOOKBACK + 1);
    let diffs: Vec<f64> = prices[start..].windows(2).map(|w| w[1] - w[0]).collect();
    if diffs.len() < 2 {
        return 0.0;
    }
    diffs.as_slice().std_dev()
}

fn band_confidence(last: f64, volatility: f64) -> f64 {
    let rel_vol = if last != 0.0 {
        volatility / last.abs()
    } else {
        0.0
    };
    (60.0 - rel_vol * 100.0).clamp(10.0, 60.0)
}

/// Carries the last known price forward. The weakest credible baseline, and
/// the same estimate the backtester substitutes when a model call fails.
pub struct NaiveForecaster;

#[async_trait]
impl Forecaster for NaiveForecaster {
    fn name(&self) -> &str {
        "naive"
    }

    async fn predict(&self, prices: &[f64], horizon: usize) -> PipelineResult<ForecastResult> {
        if horizon == 0 {
            return Err(PipelineError::InvalidForecast(
                "horizon must be positive".to_string(),
            ));
        }
        let last = prices.last().copied().ok_or_else(|| {
            PipelineError::InsufficientData("naive forecast needs at least one price".to_string())
        })?;

        let volatility = step_volatility(prices);
        let predictions = vec![last; horizon];
        let confidence_low: Vec<f64> = (0..horizon)
            .map(|i| last - volatility * ((i + 1) as f64).sqrt())
            .collect();
        let confidence_high: Vec<f64> = (0..horizon)
            .map(|i| last + volatility * ((i + 1) as f64).sqrt())
            .collect();

        ForecastResult::try_new(
            self.name(),
            predictions,
            confidence_low,
            confidence_high,
            Direction::Neutral,
            band_confidence(last, volatility),
        )
    }
}

/// Extrapolates the mean one-step drift of the recent history.
pub struct DriftForecaster {
    lookback: usize,
}

impl DriftForecaster {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback: lookback.max(2),
        }
    }
}

impl Default for DriftForecaster {
    fn default() -> Self {
        Self::new(30)
    }
}

#[async_trait]
impl Forecaster for DriftForecaster {
    fn name(&self) -> &str {
        "drift"
    }

    async fn predict(&self, prices: &[f64], horizon: usize) -> PipelineResult<ForecastResult> {
        if horizon == 0 {
            return Err(PipelineError::InvalidForecast(
                "horizon must be positive".to_string(),
            ));
        }
        if prices.len() < 2 {
            return Err(PipelineError::InsufficientData(
                "drift forecast needs at least two prices".to_string(),
            ));
        }

        let start = prices.len().saturating_sub(self.lookback + 1);
        let window = &prices[start..];
        let drift = window.windows(2).map(|w| w[1] - w[0]).sum::<f64>()
            / (window.len() - 1) as f64;
        let last = window[window.len() - 1];

        let volatility = step_volatility(prices);
        let predictions: Vec<f64> = (0..horizon)
            .map(|i| last + drift * (i + 1) as f64)
            .collect();
        let confidence_low: Vec<f64> = predictions
            .iter()
            .enumerate()
            .map(|(i, p)| p - volatility * ((i + 1) as f64).sqrt())
            .collect();
        let confidence_high: Vec<f64> = predictions
            .iter()
            .enumerate()
            .map(|(i, p)| p + volatility * ((i + 1) as f64).sqrt())
            .collect();

        let end = predictions[predictions.len() - 1];
        ForecastResult::try_new(
            self.name(),
            predictions,
            confidence_low,
            confidence_high,
            Direction::classify(last, end),
            band_confidence(last, volatility),
        )
    }
}
