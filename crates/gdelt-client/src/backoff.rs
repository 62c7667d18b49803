use async_trait::async_trait;
use chrono::Utc;
use pipeline_core::GdeltConfig;
use std::time::Duration;

use crate::error::{GdeltError, GdeltResult};
use crate::{ArticleFilters, ArticleSearch, RawArticle};

/// Sleep used between rate-limited attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchParams {
    pub query: String,
    pub lookback_days: i64,
    pub num_records: u32,
    pub max_retries: u32,
    pub base_sleep_seconds: u64,
}

impl From<&GdeltConfig> for FetchParams {
    fn from(config: &GdeltConfig) -> Self {
        Self {
            query: config.query.clone(),
            lookback_days: config.lookback_days,
            num_records: config.num_records,
            max_retries: config.max_retries,
            base_sleep_seconds: config.base_sleep_seconds,
        }
    }
}

/// Linear backoff: `max(base, base * attempt)` seconds, attempts counted from 1.
pub fn backoff_delay(base_sleep_seconds: u64, attempt: u32) -> Duration {
    let scaled = base_sleep_seconds.saturating_mul(u64::from(attempt));
    Duration::from_secs(base_sleep_seconds.max(scaled))
}

/// Fetch English headlines for `params.query` over the last `lookback_days`.
///
/// Only rate limiting is retried, at most `max_retries` times. Every other
/// error is returned on the spot.
pub async fn fetch_articles(
    search: &dyn ArticleSearch,
    sleeper: &dyn Sleeper,
    params: &FetchParams,
) -> GdeltResult<Vec<RawArticle>> {
    let end = Utc::now();
    let start = chrono::Duration::try_days(params.lookback_days)
        .and_then(|span| end.checked_sub_signed(span))
        .ok_or(GdeltError::InvalidWindow(params.lookback_days))?;
    let filters = ArticleFilters {
        keyword: params.query.clone(),
        start,
        end,
        num_records: params.num_records,
        language: "english".to_string(),
    };

    for attempt in 1..=params.max_retries {
        match search.search(&filters).await {
            Ok(rows) => return Ok(rows),
            Err(e) if e.is_rate_limit() => {
                let delay = backoff_delay(params.base_sleep_seconds, attempt);
                tracing::warn!(
                    "[GDELT] Rate limited. Sleeping {}s (attempt {}/{})",
                    delay.as_secs(),
                    attempt,
                    params.max_retries
                );
                sleeper.sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }

    Err(GdeltError::RateLimitExhausted {
        attempts: params.max_retries,
    })
}
