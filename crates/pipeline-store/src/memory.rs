use async_trait::async_trait;
use pipeline_core::{
    Article, ArticleSentiment, ConflictPolicy, NewArticle, PendingArticle, Persisted, PriceDaily,
};
use std::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::PipelineStore;

/// What a write does given the position of a row with the same key, if any.
#[derive(Debug, PartialEq, Eq)]
enum Write {
    Insert,
    Replace(usize),
    Skip,
}

fn resolve<T: Persisted>(existing: Option<usize>) -> Write {
    match (existing, T::ON_CONFLICT) {
        (None, _) => Write::Insert,
        (Some(i), ConflictPolicy::Overwrite) => Write::Replace(i),
        (Some(_), ConflictPolicy::Ignore) => Write::Skip,
    }
}

#[derive(Default)]
struct Tables {
    next_article_id: i64,
    articles: Vec<Article>,
    sentiments: Vec<ArticleSentiment>,
    prices: Vec<PriceDaily>,
}

/// Process-local store with the same key and conflict rules as the
/// Postgres schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // A panicked test thread must not hide the data from the assertions.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PipelineStore for MemoryStore {
    async fn insert_article(&self, article: &NewArticle) -> StoreResult<bool> {
        let mut t = self.lock();
        let existing = t.articles.iter().position(|a| a.url == article.url);

        match resolve::<NewArticle>(existing) {
            Write::Skip => Ok(false),
            Write::Replace(i) => {
                let id = t.articles[i].id;
                t.articles[i] = stored_article(id, article);
                Ok(true)
            }
            Write::Insert => {
                t.next_article_id += 1;
                let id = t.next_article_id;
                t.articles.push(stored_article(id, article));
                Ok(true)
            }
        }
    }

    async fn count_articles(&self) -> StoreResult<i64> {
        Ok(self.lock().articles.len() as i64)
    }

    async fn find_article_by_url(&self, url: &str) -> StoreResult<Option<Article>> {
        Ok(self.lock().articles.iter().find(|a| a.url == url).cloned())
    }

    async fn unscored_articles(&self, model: &str, limit: i64) -> StoreResult<Vec<PendingArticle>> {
        let t = self.lock();
        let mut pending: Vec<&Article> = t
            .articles
            .iter()
            .filter(|a| {
                !t.sentiments
                    .iter()
                    .any(|s| s.article_id == a.id && s.model == model)
            })
            .collect();

        pending.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(pending
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|a| PendingArticle {
                id: a.id,
                title: a.title.clone(),
            })
            .collect())
    }

    async fn insert_sentiments(&self, rows: &[ArticleSentiment]) -> StoreResult<u64> {
        let mut t = self.lock();

        // Validate first so a bad row leaves nothing behind.
        if let Some(bad) = rows
            .iter()
            .find(|r| !t.articles.iter().any(|a| a.id == r.article_id))
        {
            return Err(StoreError::UnknownArticle(bad.article_id));
        }

        let mut inserted = 0;
        for row in rows {
            let existing = t
                .sentiments
                .iter()
                .position(|s| s.article_id == row.article_id && s.model == row.model);

            match resolve::<ArticleSentiment>(existing) {
                Write::Insert => {
                    t.sentiments.push(row.clone());
                    inserted += 1;
                }
                Write::Replace(i) => {
                    t.sentiments[i] = row.clone();
                    inserted += 1;
                }
                Write::Skip => {}
            }
        }
        Ok(inserted)
    }

    async fn sentiments_for(&self, article_id: i64) -> StoreResult<Vec<ArticleSentiment>> {
        let mut rows: Vec<ArticleSentiment> = self
            .lock()
            .sentiments
            .iter()
            .filter(|s| s.article_id == article_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.model.cmp(&b.model));
        Ok(rows)
    }

    async fn upsert_price(&self, price: &PriceDaily) -> StoreResult<()> {
        let mut t = self.lock();
        let existing = t
            .prices
            .iter()
            .position(|p| p.ticker == price.ticker && p.day == price.day);

        match resolve::<PriceDaily>(existing) {
            Write::Insert => t.prices.push(price.clone()),
            Write::Replace(i) => t.prices[i] = price.clone(),
            Write::Skip => {}
        }
        Ok(())
    }

    async fn prices_for(&self, ticker: &str) -> StoreResult<Vec<PriceDaily>> {
        let mut rows: Vec<PriceDaily> = self
            .lock()
            .prices
            .iter()
            .filter(|p| p.ticker == ticker)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.day);
        Ok(rows)
    }
}

fn stored_article(id: i64, article: &NewArticle) -> Article {
    Article {
        id,
        published_at: article.published_at,
        source: article.source.clone(),
        title: article.title.clone(),
        url: article.url.clone(),
        raw_json: article.raw_json.clone(),
    }
}
