//! GDELT headlines into the `articles` table.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use gdelt_client::{fetch_articles, ArticleSearch, FetchParams, RawArticle, Sleeper};
use pipeline_core::{GdeltConfig, NewArticle};
use pipeline_store::{PipelineStore, StoreResult};
use serde_json::Value;
use std::time::Duration;

/// Zone-less layouts, read as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y%m%dT%H%M%SZ",
    "%Y%m%dT%H%M%S",
    "%Y%m%d%H%M%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub fetched: usize,
    pub inserted: u64,
    pub total_articles: i64,
}

/// Publication time of a GDELT record.
///
/// Integers are unix seconds. Strings may be RFC 3339, ISO-8601 without a zone,
/// GDELT's basic `20240101T000000Z`, or a bare date. Anything else falls back
/// to `now`.
pub fn to_published_at(value: Option<&Value>, now: DateTime<Utc>) -> DateTime<Utc> {
    let parsed = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        Some(Value::String(s)) => parse_date_str(s),
        _ => None,
    };

    parsed.unwrap_or_else(|| {
        tracing::debug!("Unparseable seendate {:?}, using ingestion time", value);
        now
    })
}

fn parse_date_str(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(day) = NaiveDate::parse_from_str(s, fmt) {
            return day.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
        }
    }
    None
}

fn non_empty_str<'a>(raw: &'a RawArticle, key: &str) -> Option<&'a str> {
    raw.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Map one provider record to a row. Records without a URL are dropped.
pub fn article_from_raw(raw: &RawArticle, now: DateTime<Utc>) -> Option<NewArticle> {
    let url = non_empty_str(raw, "url")?;

    let source = non_empty_str(raw, "domain")
        .or_else(|| non_empty_str(raw, "sourcecountry"))
        .or_else(|| non_empty_str(raw, "sourceCountry"))
        .map(str::to_string);

    Some(NewArticle {
        published_at: to_published_at(raw.get("seendate"), now),
        source,
        title: raw
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        url: url.to_string(),
        raw_json: Value::Object(raw.clone()),
    })
}

/// Insert each record, one statement per row. Returns rows actually inserted.
pub async fn upsert_articles(store: &dyn PipelineStore, rows: &[RawArticle]) -> StoreResult<u64> {
    let now = Utc::now();
    let mut inserted = 0;

    for raw in rows {
        let Some(article) = article_from_raw(raw, now) else {
            tracing::debug!("Skipping GDELT record without url");
            continue;
        };
        if store.insert_article(&article).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

/// Fetch, store and report. The initial delay goes through `sleeper` as well.
pub async fn ingest_articles(
    search: &dyn ArticleSearch,
    sleeper: &dyn Sleeper,
    store: &dyn PipelineStore,
    config: &GdeltConfig,
) -> Result<IngestReport> {
    if config.initial_delay_seconds > 0 {
        sleeper
            .sleep(Duration::from_secs(config.initial_delay_seconds))
            .await;
    }

    let rows = fetch_articles(search, sleeper, &FetchParams::from(config))
        .await
        .with_context(|| format!("GDELT fetch failed for query {:?}", config.query))?;
    tracing::info!("[GDELT] fetched={}", rows.len());

    let inserted = upsert_articles(store, &rows)
        .await
        .context("Failed to store articles")?;
    tracing::info!("[DB] inserted={} (duplicates ignored by url)", inserted);

    let total_articles = store
        .count_articles()
        .await
        .context("Failed to count articles")?;
    tracing::info!("[DB] total_articles={}", total_articles);

    Ok(IngestReport {
        fetched: rows.len(),
        inserted,
        total_articles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap()
    }

    fn raw(value: Value) -> RawArticle {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn parses_gdelt_basic_format() {
        assert_eq!(
            to_published_at(Some(&json!("20240101T000000Z")), now()),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn parses_other_layouts() {
        let expect = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        for v in [
            json!("2024-03-05T14:30:00Z"),
            json!("2024-03-05T16:30:00+02:00"),
            json!("2024-03-05T14:30:00"),
            json!("2024-03-05 14:30:00"),
            json!("20240305143000"),
            json!(1709649000),
        ] {
            assert_eq!(to_published_at(Some(&v), now()), expect, "{v}");
        }
        assert_eq!(
            to_published_at(Some(&json!("2024-03-05")), now()),
            Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn unparseable_dates_fall_back_to_now() {
        for v in [json!("yesterday"), json!(""), json!(null), json!({"a": 1})] {
            assert_eq!(to_published_at(Some(&v), now()), now());
        }
        assert_eq!(to_published_at(None, now()), now());
    }

    #[test]
    fn source_prefers_domain_then_country() {
        let a = article_from_raw(
            &raw(json!({"url": "http://x/1", "domain": "x.com", "sourcecountry": "US"})),
            now(),
        )
        .unwrap();
        assert_eq!(a.source.as_deref(), Some("x.com"));

        let b = article_from_raw(&raw(json!({"url": "http://x/2", "sourceCountry": "FR"})), now()).unwrap();
        assert_eq!(b.source.as_deref(), Some("FR"));

        let c = article_from_raw(&raw(json!({"url": "http://x/3", "domain": ""})), now()).unwrap();
        assert_eq!(c.source, None);
        assert_eq!(c.title, "");
    }

    #[test]
    fn keeps_the_raw_record() {
        let record = raw(json!({"url": "http://x/1", "title": "Up", "language": "English"}));
        let a = article_from_raw(&record, now()).unwrap();
        assert_eq!(a.raw_json, Value::Object(record));
        assert_eq!(a.title, "Up");
    }

    #[test]
    fn records_without_url_are_dropped() {
        assert!(article_from_raw(&raw(json!({"title": "no link"})), now()).is_none());
        assert!(article_from_raw(&raw(json!({"url": "  "})), now()).is_none());
    }
}
