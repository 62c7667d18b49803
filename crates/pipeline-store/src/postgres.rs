use async_trait::async_trait;
use pipeline_core::{Article, ArticleSentiment, NewArticle, PendingArticle, PriceDaily};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;

use crate::error::StoreResult;
use crate::sql::{upsert_sql, UNSCORED_ARTICLES};
use crate::PipelineStore;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect with a single-connection pool and make sure the schema exists.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;

        Ok(store)
    }

    /// Run `schema.sql`. Every statement is idempotent.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for stmt in schema_statements() {
            sqlx::query(stmt).execute(&self.pool).await?;
        }

        tracing::debug!("[DB] schema ready");
        Ok(())
    }
}

// sqlx prepares one statement at a time
fn schema_statements() -> impl Iterator<Item = &'static str> {
    include_str!("../../../schema.sql")
        .split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty())
}

fn article_from_row(row: &PgRow) -> Result<Article, sqlx::Error> {
    let raw: Json<serde_json::Value> = row.try_get("raw_json")?;
    Ok(Article {
        id: row.try_get("id")?,
        published_at: row.try_get("published_at")?,
        source: row.try_get("source")?,
        title: row.try_get("title")?,
        url: row.try_get("url")?,
        raw_json: raw.0,
    })
}

fn price_from_row(row: &PgRow) -> Result<PriceDaily, sqlx::Error> {
    Ok(PriceDaily {
        ticker: row.try_get("ticker")?,
        day: row.try_get("day")?,
        open: row.try_get("open")?,
        high: row.try_get("high")?,
        low: row.try_get("low")?,
        close: row.try_get("close")?,
        volume: row.try_get("volume")?,
    })
}

#[async_trait]
impl PipelineStore for PgStore {
    async fn insert_article(&self, article: &NewArticle) -> StoreResult<bool> {
        let result = sqlx::query(&upsert_sql::<NewArticle>())
            .bind(article.published_at)
            .bind(&article.source)
            .bind(&article.title)
            .bind(&article.url)
            .bind(Json(&article.raw_json))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_articles(&self) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn find_article_by_url(&self, url: &str) -> StoreResult<Option<Article>> {
        let row = sqlx::query(
            "SELECT id, published_at, source, title, url, raw_json FROM articles WHERE url = $1",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(article_from_row).transpose()?)
    }

    async fn unscored_articles(&self, model: &str, limit: i64) -> StoreResult<Vec<PendingArticle>> {
        let rows: Vec<(i64, String)> = sqlx::query_as(UNSCORED_ARTICLES)
            .bind(model)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, title)| PendingArticle { id, title })
            .collect())
    }

    async fn insert_sentiments(&self, rows: &[ArticleSentiment]) -> StoreResult<u64> {
        let sql = upsert_sql::<ArticleSentiment>();
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for row in rows {
            let result = sqlx::query(&sql)
                .bind(row.article_id)
                .bind(&row.model)
                .bind(row.pos)
                .bind(row.neg)
                .bind(row.neu)
                .execute(&mut *tx)
                .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn sentiments_for(&self, article_id: i64) -> StoreResult<Vec<ArticleSentiment>> {
        let rows: Vec<(i64, String, f64, f64, f64)> = sqlx::query_as(
            "SELECT article_id, model, pos, neg, neu FROM article_sentiment \
             WHERE article_id = $1 ORDER BY model",
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(article_id, model, pos, neg, neu)| ArticleSentiment {
                article_id,
                model,
                pos,
                neg,
                neu,
            })
            .collect())
    }

    async fn upsert_price(&self, price: &PriceDaily) -> StoreResult<()> {
        sqlx::query(&upsert_sql::<PriceDaily>())
            .bind(&price.ticker)
            .bind(price.day)
            .bind(price.open)
            .bind(price.high)
            .bind(price.low)
            .bind(price.close)
            .bind(price.volume)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn prices_for(&self, ticker: &str) -> StoreResult<Vec<PriceDaily>> {
        let rows = sqlx::query(
            "SELECT ticker, day, open, high, low, close, volume FROM prices_daily \
             WHERE ticker = $1 ORDER BY day",
        )
        .bind(ticker)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(price_from_row).collect::<Result<_, _>>()?)
    }
}
