use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("train/val/test ratios must sum to 1.0, got {sum}")]
    InvalidRatio { sum: f64 },

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("prediction/actual length mismatch: {predicted} predicted vs {actual} actual")]
    LengthMismatch { predicted: usize, actual: usize },

    #[error("no predictions produced: every forecast step failed")]
    NoPredictions,

    #[error("all ensemble models failed")]
    AllModelsFailed,

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("no forecasting models registered")]
    NoModelsAvailable,

    #[error("invalid ensemble weights: {0}")]
    InvalidWeights(String),

    #[error("invalid forecast: {0}")]
    InvalidForecast(String),

    #[error("model error: {0}")]
    Model(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
