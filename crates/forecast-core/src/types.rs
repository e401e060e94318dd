use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Direction of a predicted price move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Neutral,
}

impl Direction {
    /// Moves within ±1% of the reference price are classified as neutral.
    pub const NEUTRAL_BAND_PCT: f64 = 1.0;

    /// Classify a predicted end price against the last known price.
    pub fn classify(last_price: f64, predicted: f64) -> Self {
        if last_price == 0.0 {
            return Direction::Neutral;
        }
        let change_pct = (predicted - last_price) / last_price * 100.0;
        if change_pct > Self::NEUTRAL_BAND_PCT {
            Direction::Up
        } else if change_pct < -Self::NEUTRAL_BAND_PCT {
            Direction::Down
        } else {
            Direction::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Neutral => "neutral",
        }
    }
}

/// A single forecast produced by one model (or an ensemble of models).
///
/// `predictions`, `confidence_low` and `confidence_high` are parallel
/// sequences of exactly `horizon` future prices, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResult {
    pub model: String,
    pub predictions: Vec<f64>,
    pub confidence_low: Vec<f64>,
    pub confidence_high: Vec<f64>,
    pub direction: Direction,
    /// Model confidence in its own direction call, 0-100.
    pub confidence_pct: f64,
    pub horizon: usize,
}

impl ForecastResult {
    /// Build a forecast, rejecting shapes that would corrupt downstream
    /// aggregation (band/prediction length drift, zero horizon, confidence
    /// outside 0-100).
    pub fn try_new(
        model: impl Into<String>,
        predictions: Vec<f64>,
        confidence_low: Vec<f64>,
        confidence_high: Vec<f64>,
        direction: Direction,
        confidence_pct: f64,
    ) -> PipelineResult<Self> {
        let horizon = predictions.len();
        if horizon == 0 {
            return Err(PipelineError::InvalidForecast(
                "forecast must contain at least one prediction".to_string(),
            ));
        }
        if confidence_low.len() != horizon || confidence_high.len() != horizon {
            return Err(PipelineError::InvalidForecast(format!(
                "confidence bands ({}/{}) do not match prediction length {}",
                confidence_low.len(),
                confidence_high.len(),
                horizon
            )));
        }
        if !(0.0..=100.0).contains(&confidence_pct) {
            return Err(PipelineError::InvalidForecast(format!(
                "confidence_pct {} outside 0-100",
                confidence_pct
            )));
        }
        Ok(Self {
            model: model.into(),
            predictions,
            confidence_low,
            confidence_high,
            direction,
            confidence_pct,
            horizon,
        })
    }

    /// Last predicted price, the point backtests compare against actuals.
    pub fn final_prediction(&self) -> Option<f64> {
        self.predictions.last().copied()
    }
}
