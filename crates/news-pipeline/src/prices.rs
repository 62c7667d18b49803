use anyhow::{Context, Result};
use market_data_client::{DailyBarSource, MarketDataError, Period};
use pipeline_core::PriceDaily;
use pipeline_store::PipelineStore;

/// Fetch daily bars for `ticker` and upsert them. Re-ingesting a day
/// replaces its prices. Returns the number of rows written.
pub async fn ingest_prices(
    source: &dyn DailyBarSource,
    store: &dyn PipelineStore,
    ticker: &str,
    period: &Period,
) -> Result<usize> {
    let bars = source
        .daily_bars(ticker, period)
        .await
        .with_context(|| format!("Price download failed for {} ({})", ticker, period))?;

    if bars.is_empty() {
        return Err(MarketDataError::NoData(ticker.to_string()).into());
    }

    for bar in &bars {
        let row = PriceDaily {
            ticker: ticker.to_string(),
            day: bar.day,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        };
        store
            .upsert_price(&row)
            .await
            .with_context(|| format!("Failed to store {} bar for {}", ticker, bar.day))?;
    }

    tracing::info!("Upserted {} rows into prices_daily for {}", bars.len(), ticker);
    Ok(bars.len())
}
