//! ingest-articles: pull recent GDELT headlines into `articles`.

use anyhow::{Context, Result};
use gdelt_client::{GdeltClient, TokioSleeper};
use news_pipeline::{ingest_articles, init_tracing};
use pipeline_core::{DatabaseConfig, GdeltConfig};
use pipeline_store::PgStore;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let db = DatabaseConfig::from_env().context("Invalid database configuration")?;
    let config = GdeltConfig::from_env().context("Invalid GDELT configuration")?;

    let store = PgStore::connect(&db.url)
        .await
        .context("Failed to connect to Postgres")?;

    tracing::info!(
        "[GDELT] query={:?} lookback_days={} num_records={}",
        config.query,
        config.lookback_days,
        config.num_records
    );
    ingest_articles(&GdeltClient::new(), &TokioSleeper, &store, &config).await?;

    Ok(())
}
