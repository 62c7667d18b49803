//! ingest-prices: daily OHLCV bars into `prices_daily`.

use anyhow::{Context, Result};
use market_data_client::{Period, YahooClient};
use news_pipeline::{ingest_prices, init_tracing};
use pipeline_core::{DatabaseConfig, PriceConfig};
use pipeline_store::PgStore;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let db = DatabaseConfig::from_env().context("Invalid database configuration")?;
    let config = PriceConfig::from_env().context("Invalid price configuration")?;
    let period: Period = config
        .period
        .parse()
        .context("Invalid PRICE_PERIOD")?;
    period
        .start(chrono::Utc::now())
        .context("Invalid PRICE_PERIOD")?;

    let store = PgStore::connect(&db.url)
        .await
        .context("Failed to connect to Postgres")?;

    ingest_prices(&YahooClient::new(), &store, &config.ticker, &period).await?;

    Ok(())
}
