//! score-sentiment: classify headlines that have no score for the configured model.

use anyhow::{Context, Result};
use news_pipeline::{init_tracing, score_pending};
use pipeline_core::{DatabaseConfig, ScoringConfig};
use pipeline_store::PgStore;
use sentiment_scorer::{SentimentConfig, SentimentScorer};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let db = DatabaseConfig::from_env().context("Invalid database configuration")?;
    let scoring = ScoringConfig::from_env().context("Invalid scoring configuration")?;
    let sentiment = SentimentConfig::from_env().context("Invalid sentiment model configuration")?;

    let store = PgStore::connect(&db.url)
        .await
        .context("Failed to connect to Postgres")?;

    let scorer = SentimentScorer::initialize(&sentiment)
        .await
        .with_context(|| format!("Failed to load sentiment model {}", sentiment.model))?;
    tracing::info!(
        "Loaded {} via {} backend (labels: {:?})",
        scorer.model_id(),
        scorer.backend_name(),
        scorer.labels().labels()
    );

    let result = score_pending(&store, &scorer, scoring.limit).await;
    scorer.shutdown().await.context("Failed to shut down sentiment model")?;
    result?;

    Ok(())
}
