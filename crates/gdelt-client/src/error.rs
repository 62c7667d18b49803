use thiserror::Error;

#[derive(Error, Debug)]
pub enum GdeltError {
    /// The API asked us to slow down. The only retryable error.
    #[error("GDELT rate limit hit")]
    RateLimited,

    #[error("GDELT rate limit persisted after {attempts} attempts; wait a minute and try again")]
    RateLimitExhausted { attempts: u32 },

    #[error("Lookback of {0} days is outside the representable date range")]
    InvalidWindow(i64),

    #[error("GDELT API error: {0}")]
    Api(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Invalid GDELT response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GdeltError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, GdeltError::RateLimited)
    }
}

pub type GdeltResult<T> = Result<T, GdeltError>;
