//! GDELT DOC 2.0 article-list client.
//!
//! Only `mode=artlist` is used: headline-level records (url, title, seendate,
//! domain, language, sourcecountry) for a keyword inside a date window.

pub mod backoff;
pub mod error;

pub use backoff::{backoff_delay, fetch_articles, FetchParams, Sleeper, TokioSleeper};
pub use error::{GdeltError, GdeltResult};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const BASE_URL: &str = "https://api.gdeltproject.org/api/v2/doc/doc";

/// Body GDELT sends (sometimes with HTTP 200) when throttling a caller.
const RATE_LIMIT_NOTICE: &str = "Please limit requests";

/// One article record exactly as GDELT returned it.
pub type RawArticle = serde_json::Map<String, serde_json::Value>;

/// Search window and filters for one `artlist` request.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleFilters {
    pub keyword: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub num_records: u32,
    pub language: String,
}

impl ArticleFilters {
    /// `query` parameter: keyword (quoted when it is a phrase) plus the language filter.
    pub fn query_string(&self) -> String {
        let keyword = self.keyword.trim();
        let keyword = if keyword.contains(char::is_whitespace) {
            format!("\"{}\"", keyword)
        } else {
            keyword.to_string()
        };
        format!("{} sourcelang:{}", keyword, self.language)
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("query", self.query_string()),
            ("mode", "artlist".to_string()),
            ("format", "json".to_string()),
            ("maxrecords", self.num_records.to_string()),
            ("startdatetime", self.start.format("%Y%m%d%H%M%S").to_string()),
            ("enddatetime", self.end.format("%Y%m%d%H%M%S").to_string()),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct ArtListResponse {
    #[serde(default)]
    articles: Option<Vec<RawArticle>>,
}

/// Anything that can run one article search. Seam for the retry loop.
#[async_trait]
pub trait ArticleSearch: Send + Sync {
    async fn search(&self, filters: &ArticleFilters) -> GdeltResult<Vec<RawArticle>>;
}

#[derive(Clone)]
pub struct GdeltClient {
    client: Client,
    base_url: String,
}

impl Default for GdeltClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GdeltClient {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ArticleSearch for GdeltClient {
    async fn search(&self, filters: &ArticleFilters) -> GdeltResult<Vec<RawArticle>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&filters.params())
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        parse_artlist(status, &body)
    }
}

/// Interpret one `artlist` response.
///
/// Throttling is reported either as HTTP 429 or as a plain-text notice; other
/// plain-text bodies are query errors. JSON bodies are never read as a notice. An empty body or a document without
/// `articles` means nothing matched.
pub fn parse_artlist(status: u16, body: &str) -> GdeltResult<Vec<RawArticle>> {
    let trimmed = body.trim();
    let is_json = trimmed.starts_with('{');
    if status == 429 || (!is_json && trimmed.contains(RATE_LIMIT_NOTICE)) {
        return Err(GdeltError::RateLimited);
    }

    if !(200..300).contains(&status) {
        return Err(GdeltError::Api(format!("HTTP {}: {}", status, snippet(trimmed))));
    }
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if !is_json {
        return Err(GdeltError::Api(snippet(trimmed)));
    }

    let parsed: ArtListResponse = serde_json::from_str(trimmed)?;
    Ok(parsed.articles.unwrap_or_default())
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn filters(keyword: &str) -> ArticleFilters {
        ArticleFilters {
            keyword: keyword.to_string(),
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 2, 6, 30, 5).unwrap(),
            num_records: 10,
            language: "english".to_string(),
        }
    }

    #[test]
    fn builds_artlist_parameters() {
        let params = filters("Apple").params();
        let get = |k: &str| params.iter().find(|(n, _)| *n == k).map(|(_, v)| v.clone()).unwrap();
        assert_eq!(get("query"), "Apple sourcelang:english");
        assert_eq!(get("mode"), "artlist");
        assert_eq!(get("format"), "json");
        assert_eq!(get("maxrecords"), "10");
        assert_eq!(get("startdatetime"), "20240101000000");
        assert_eq!(get("enddatetime"), "20240102063005");
    }

    #[test]
    fn phrases_are_quoted() {
        assert_eq!(
            filters(" Apple earnings ").query_string(),
            "\"Apple earnings\" sourcelang:english"
        );
    }

    #[test]
    fn detects_rate_limits() {
        assert!(parse_artlist(429, "").unwrap_err().is_rate_limit());
        assert!(parse_artlist(200, "Please limit requests to one every 5 seconds or contact ...")
            .unwrap_err()
            .is_rate_limit());
    }

    #[test]
    fn notice_text_inside_results_is_not_a_rate_limit() {
        let body = r#"{"articles": [
            {"url": "http://x/1", "title": "Please limit requests, says regulator"}
        ]}"#;
        let rows = parse_artlist(200, body).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!GdeltError::Api(String::new()).is_rate_limit());
    }

    #[test]
    fn empty_results_are_not_errors() {
        assert!(parse_artlist(200, "").unwrap().is_empty());
        assert!(parse_artlist(200, "{}").unwrap().is_empty());
        assert!(parse_artlist(200, r#"{"articles": []}"#).unwrap().is_empty());
    }

    #[test]
    fn parses_article_records() {
        let body = r#"{"articles": [
            {"url": "http://x/1", "title": "Stocks rally", "seendate": "20240101T000000Z",
             "domain": "x.com", "language": "English", "sourcecountry": "United States"}
        ]}"#;
        let rows = parse_artlist(200, body).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["url"], "http://x/1");
        assert_eq!(rows[0]["seendate"], "20240101T000000Z");
    }

    #[test]
    fn other_failures_are_api_errors() {
        assert!(matches!(parse_artlist(500, "boom"), Err(GdeltError::Api(_))));
        assert!(matches!(
            parse_artlist(200, "The specified phrase is too short."),
            Err(GdeltError::Api(_))
        ));
        assert!(matches!(parse_artlist(200, "{not json"), Err(GdeltError::Decode(_))));
    }
}
