use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScorerError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Model configuration error: {0}")]
    ModelConfig(String),

    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(String),
}

pub type ScorerResult<T> = Result<T, ScorerError>;
