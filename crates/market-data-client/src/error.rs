use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("No price data returned for {0}")]
    NoData(String),

    #[error("Invalid period {0:?}: expected <n>d, <n>wk, <n>mo, <n>y, ytd or max")]
    InvalidPeriod(String),

    #[error("Period {0} reaches past the representable date range")]
    PeriodOutOfRange(String),

    #[error("Market data API error: {0}")]
    Api(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Invalid market data response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type MarketDataResult<T> = Result<T, MarketDataError>;
