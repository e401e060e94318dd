use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use forecast_core::{Direction, ForecastResult, Forecaster, PipelineError, PipelineResult};

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Serialize)]
struct PredictionRequest<'a> {
    model: &'a str,
    prices: &'a [f64],
    horizon: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct PredictionResponse {
    predictions: Vec<f64>,
    confidence_low: Vec<f64>,
    confidence_high: Vec<f64>,
    direction: Direction,
    confidence_pct: f64,
}

/// Forecaster backed by the model service (NeuralProphet, Chronos and
/// friends run out of process; this client only ships prices and reads
/// predictions back).
#[derive(Clone)]
pub struct RemoteForecaster {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl RemoteForecaster {
    pub fn new(model: impl Into<String>, base_url: String, timeout: Duration) -> ClientResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            model: model.into(),
        })
    }

    async fn predict_remote(&self, prices: &[f64], horizon: usize) -> ClientResult<PredictionResponse> {
        let request = PredictionRequest {
            model: &self.model,
            prices,
            horizon,
        };

        let response = self
            .client
            .post(format!("{}/predict", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
                return Err(ClientError::ModelNotLoaded);
            }
            return Err(ClientError::ServiceUnavailable(format!("Status: {}", status)));
        }

        Ok(response.json::<PredictionResponse>().await?)
    }

    /// Check service health.
    pub async fn health(&self) -> ClientResult<bool> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}

#[async_trait]
impl Forecaster for RemoteForecaster {
    fn name(&self) -> &str {
        &self.model
    }

    async fn predict(&self, prices: &[f64], horizon: usize) -> PipelineResult<ForecastResult> {
        let response = self
            .predict_remote(prices, horizon)
            .await
            .map_err(|e| PipelineError::Model(e.to_string()))?;

        if response.predictions.len() != horizon {
            return Err(PipelineError::InvalidForecast(format!(
                "service returned {} predictions for horizon {}",
                response.predictions.len(),
                horizon
            )));
        }

        ForecastResult::try_new(
            self.model.clone(),
            response.predictions,
            response.confidence_low,
            response.confidence_high,
            response.direction,
            response.confidence_pct,
        )
    }
}
