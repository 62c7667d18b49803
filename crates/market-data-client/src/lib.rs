//! Daily OHLCV bars from the Yahoo Finance chart API.

pub mod error;
pub mod period;

pub use error::{MarketDataError, MarketDataResult};
pub use period::Period;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) headline-pulse/0.1";

/// One trading day, dated in the exchange's local calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub day: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<i64>,
}

#[async_trait]
pub trait DailyBarSource: Send + Sync {
    /// Bars for `ticker` covering `period`, oldest first. Empty when the
    /// provider has nothing for the window.
    async fn daily_bars(&self, ticker: &str, period: &Period) -> MarketDataResult<Vec<DailyBar>>;
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooClient {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl DailyBarSource for YahooClient {
    async fn daily_bars(&self, ticker: &str, period: &Period) -> MarketDataResult<Vec<DailyBar>> {
        let end = Utc::now();
        let start = period.start(end)?;
        let url = format!("{}/{}", self.base_url, ticker);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", start.timestamp().to_string()),
                ("period2", end.timestamp().to_string()),
                ("interval", "1d".to_string()),
                ("includePrePost", "false".to_string()),
            ])
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        parse_chart(ticker, status, &body)
    }
}

/// Interpret one chart response.
///
/// "Not Found" errors mean the symbol has no data; other provider errors
/// and non-JSON bodies are API errors.
pub fn parse_chart(ticker: &str, status: u16, body: &str) -> MarketDataResult<Vec<DailyBar>> {
    let trimmed = body.trim();
    if status == 429 {
        return Err(MarketDataError::Api("rate limit exceeded".to_string()));
    }
    if !trimmed.starts_with('{') {
        return Err(MarketDataError::Api(format!(
            "HTTP {}: {}",
            status,
            trimmed.chars().take(200).collect::<String>()
        )));
    }

    let envelope: ChartEnvelope = serde_json::from_str(trimmed)?;
    if let Some(err) = envelope.chart.error {
        if err.code.eq_ignore_ascii_case("Not Found") {
            return Err(MarketDataError::NoData(ticker.to_string()));
        }
        return Err(MarketDataError::Api(format!("{}: {}", err.code, err.description)));
    }
    if !(200..300).contains(&status) {
        return Err(MarketDataError::Api(format!("HTTP {}", status)));
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    Ok(bars_from_result(ticker, result))
}

fn bars_from_result(ticker: &str, result: ChartResult) -> Vec<DailyBar> {
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let offset = result.meta.gmtoffset;
    let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

    let mut bars: Vec<DailyBar> = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let Some(day) = ts
            .checked_add(offset)
            .and_then(|local| DateTime::from_timestamp(local, 0))
            .map(|d| d.date_naive())
        else {
            tracing::warn!("[Prices] {} skipping bar with bad timestamp {}", ticker, ts);
            continue;
        };

        let (Some(open), Some(high), Some(low), Some(close)) = (
            at(&quote.open, i),
            at(&quote.high, i),
            at(&quote.low, i),
            at(&quote.close, i),
        ) else {
            tracing::warn!("[Prices] {} skipping incomplete bar for {}", ticker, day);
            continue;
        };

        let bar = DailyBar {
            day,
            open,
            high,
            low,
            close,
            volume: at(&quote.volume, i).map(|v| v.round() as i64),
        };

        // The live session can arrive as a second row for the last day.
        match bars.last_mut() {
            Some(last) if last.day == day => *last = bar,
            _ => bars.push(bar),
        }
    }
    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(body: &str) -> MarketDataResult<Vec<DailyBar>> {
        parse_chart("AAPL", 200, body)
    }

    #[test]
    fn dates_use_exchange_offset() {
        // 2024-01-02 14:30 UTC is 09:30 in New York; 2024-01-03 04:00 UTC is still the 2nd there.
        let body = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":-18000},
            "timestamp":[1704205800,1704254400],
            "indicators":{"quote":[{
                "open":[187.15,185.0],"high":[188.44,186.0],"low":[183.89,184.0],
                "close":[185.64,185.5],"volume":[82488700,1000]
            }]}
        }],"error":null}}"#;

        let bars = chart(body).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].day, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[0].close, 185.5);
        assert_eq!(bars[0].volume, Some(1000));
    }

    #[test]
    fn null_volume_is_kept_as_missing() {
        let body = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":0},
            "timestamp":[1704153600],
            "indicators":{"quote":[{
                "open":[1.0],"high":[2.0],"low":[0.5],"close":[1.5],"volume":[null]
            }]}
        }]}}"#;
        let bars = chart(body).unwrap();
        assert_eq!(bars[0].volume, None);
        assert_eq!(bars[0].day, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn incomplete_bars_are_skipped() {
        let body = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":0},
            "timestamp":[1704153600,1704240000],
            "indicators":{"quote":[{
                "open":[null,1.0],"high":[2.0,2.0],"low":[0.5,0.5],"close":[1.5,1.5],"volume":[10,20]
            }]}
        }]}}"#;
        let bars = chart(body).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].volume, Some(20));
    }

    #[test]
    fn out_of_range_timestamps_are_skipped() {
        let body = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":3600},
            "timestamp":[9223372036854775807,1704153600],
            "indicators":{"quote":[{
                "open":[1.0,1.0],"high":[2.0,2.0],"low":[0.5,0.5],"close":[1.5,1.5],"volume":[10,20]
            }]}
        }]}}"#;
        let bars = chart(body).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].day, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[0].volume, Some(20));
    }

    #[test]
    fn missing_result_is_empty() {
        assert!(chart(r#"{"chart":{"result":null,"error":null}}"#).unwrap().is_empty());
        assert!(chart(r#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[{}]}}]}}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn unknown_symbol_is_no_data() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(matches!(
            parse_chart("ZZZZ", 404, body),
            Err(MarketDataError::NoData(t)) if t == "ZZZZ"
        ));
    }

    #[test]
    fn other_failures_are_api_errors() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        assert!(matches!(parse_chart("AAPL", 400, body), Err(MarketDataError::Api(_))));
        assert!(matches!(parse_chart("AAPL", 429, "Too Many Requests"), Err(MarketDataError::Api(_))));
        assert!(matches!(parse_chart("AAPL", 502, "<html>"), Err(MarketDataError::Api(_))));
    }
}
