//! Persistence for articles, sentiment scores and daily prices.
//!
//! `PgStore` is the Postgres implementation used by the binaries;
//! `MemoryStore` applies the same conflict rules in process for tests.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod sql;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use sql::upsert_sql;

use async_trait::async_trait;
use pipeline_core::{Article, ArticleSentiment, NewArticle, PendingArticle, PriceDaily};

#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Returns `false` when an article with the same URL already exists.
    async fn insert_article(&self, article: &NewArticle) -> StoreResult<bool>;

    async fn count_articles(&self) -> StoreResult<i64>;

    async fn find_article_by_url(&self, url: &str) -> StoreResult<Option<Article>>;

    /// Articles with no sentiment row for `model`, newest `published_at` first.
    async fn unscored_articles(&self, model: &str, limit: i64) -> StoreResult<Vec<PendingArticle>>;

    /// Writes the whole batch atomically. Rows whose (article, model) pair is
    /// already scored are skipped. Returns the number of rows written.
    async fn insert_sentiments(&self, rows: &[ArticleSentiment]) -> StoreResult<u64>;

    async fn sentiments_for(&self, article_id: i64) -> StoreResult<Vec<ArticleSentiment>>;

    /// Inserts the bar, or replaces every price field of an existing (ticker, day).
    async fn upsert_price(&self, price: &PriceDaily) -> StoreResult<()>;

    /// Stored bars for `ticker`, oldest first.
    async fn prices_for(&self, ticker: &str) -> StoreResult<Vec<PriceDaily>>;
}
