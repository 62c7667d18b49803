use pipeline_core::{ConflictPolicy, Persisted};

/// Single-row `INSERT ... ON CONFLICT` statement for `T`, with `$n` placeholders
/// in `T::COLUMNS` order.
pub fn upsert_sql<T: Persisted>() -> String {
    let placeholders: Vec<String> = (1..=T::COLUMNS.len()).map(|i| format!("${}", i)).collect();

    let action = match T::ON_CONFLICT {
        ConflictPolicy::Ignore => "DO NOTHING".to_string(),
        ConflictPolicy::Overwrite => {
            let sets: Vec<String> = T::update_columns()
                .iter()
                .map(|c| format!("{c} = EXCLUDED.{c}"))
                .collect();
            format!("DO UPDATE SET {}", sets.join(", "))
        }
    };

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) {}",
        T::TABLE,
        T::COLUMNS.join(", "),
        placeholders.join(", "),
        T::CONFLICT_KEY.join(", "),
        action
    )
}

/// Articles with no sentiment row for `$1` (model), newest first, at most `$2`.
pub const UNSCORED_ARTICLES: &str = "\
SELECT a.id, a.title
FROM articles a
LEFT JOIN article_sentiment s ON s.article_id = a.id AND s.model = $1
WHERE s.article_id IS NULL
ORDER BY a.published_at DESC
LIMIT $2";

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_core::{ArticleSentiment, NewArticle, PriceDaily};

    #[test]
    fn article_insert_keeps_first_write() {
        assert_eq!(
            upsert_sql::<NewArticle>(),
            "INSERT INTO articles (published_at, source, title, url, raw_json) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT (url) DO NOTHING"
        );
    }

    #[test]
    fn sentiment_insert_keys_on_article_and_model() {
        assert!(upsert_sql::<ArticleSentiment>()
            .ends_with("ON CONFLICT (article_id, model) DO NOTHING"));
    }

    #[test]
    fn price_upsert_overwrites_all_fields() {
        assert_eq!(
            upsert_sql::<PriceDaily>(),
            "INSERT INTO prices_daily (ticker, day, open, high, low, close, volume) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT (ticker, day) DO UPDATE SET \
             open = EXCLUDED.open, high = EXCLUDED.high, low = EXCLUDED.low, \
             close = EXCLUDED.close, volume = EXCLUDED.volume"
        );
    }
}
