use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::{ConflictPolicy, Persisted};

/// Default classifier identity stored alongside every sentiment row.
pub const DEFAULT_SENTIMENT_MODEL: &str = "ProsusAI/finbert";

/// Headline ready to be written to `articles`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArticle {
    pub published_at: DateTime<Utc>,
    pub source: Option<String>,
    pub title: String,
    pub url: String,
    /// Provider record exactly as fetched.
    pub raw_json: serde_json::Value,
}

impl Persisted for NewArticle {
    const TABLE: &'static str = "articles";
    const COLUMNS: &'static [&'static str] = &["published_at", "source", "title", "url", "raw_json"];
    const CONFLICT_KEY: &'static [&'static str] = &["url"];
    const ON_CONFLICT: ConflictPolicy = ConflictPolicy::Ignore;
}

/// Stored article, as read back from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub published_at: DateTime<Utc>,
    pub source: Option<String>,
    pub title: String,
    pub url: String,
    pub raw_json: serde_json::Value,
}

/// Article still waiting for a score from a given model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingArticle {
    pub id: i64,
    pub title: String,
}

/// One classifier output for one article. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSentiment {
    pub article_id: i64,
    pub model: String,
    pub pos: f64,
    pub neg: f64,
    pub neu: f64,
}

impl Persisted for ArticleSentiment {
    const TABLE: &'static str = "article_sentiment";
    const COLUMNS: &'static [&'static str] = &["article_id", "model", "pos", "neg", "neu"];
    const CONFLICT_KEY: &'static [&'static str] = &["article_id", "model"];
    const ON_CONFLICT: ConflictPolicy = ConflictPolicy::Ignore;
}

/// Daily OHLCV bar for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceDaily {
    pub ticker: String,
    pub day: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// `None` when the provider has no volume for the day.
    pub volume: Option<i64>,
}

impl Persisted for PriceDaily {
    const TABLE: &'static str = "prices_daily";
    const COLUMNS: &'static [&'static str] =
        &["ticker", "day", "open", "high", "low", "close", "volume"];
    const CONFLICT_KEY: &'static [&'static str] = &["ticker", "day"];
    const ON_CONFLICT: ConflictPolicy = ConflictPolicy::Overwrite;
}
