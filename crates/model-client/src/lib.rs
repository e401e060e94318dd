pub mod baseline;
pub mod error;
pub mod remote;

pub use baseline::{DriftForecaster, NaiveForecaster};
pub use error::{ClientError, ClientResult};
pub use remote::RemoteForecaster;

use std::time::Duration;

use forecast_core::{Forecaster, ModelRegistry, PipelineError};

/// Model names served by the forecasting microservice.
pub const REMOTE_MODELS: [&str; 3] = ["neuralprophet", "chronos", "autoarima"];

/// Configuration for the forecasting model service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub service_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        dotenvy::dotenv().ok();
        let timeout_secs = std::env::var("FORECAST_SERVICE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);
        Self {
            service_url: std::env::var("FORECAST_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8005".to_string()),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// Registry with only the in-process baseline models.
pub fn default_registry() -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    registry.register("naive", || Ok(Box::new(NaiveForecaster) as Box<dyn Forecaster>));
    registry.register("drift", || {
        Ok(Box::new(DriftForecaster::default()) as Box<dyn Forecaster>)
    });
    registry
}

/// Registry with the baselines plus every model the service hosts.
pub fn full_registry(config: &ClientConfig) -> ModelRegistry {
    let mut registry = default_registry();
    for model in REMOTE_MODELS {
        let config = config.clone();
        registry.register(model, move || {
            RemoteForecaster::new(model, config.service_url.clone(), config.timeout)
                .map(|f| Box::new(f) as Box<dyn Forecaster>)
                .map_err(|e| PipelineError::Model(e.to_string()))
        });
    }
    registry
}
