use anyhow::{Context, Result};
use pipeline_core::ArticleSentiment;
use pipeline_store::PipelineStore;
use sentiment_scorer::SentimentScorer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreReport {
    pub selected: usize,
    pub inserted: u64,
}

/// Score up to `limit` articles that have no row for the scorer's model yet,
/// newest first, in one model call and one transaction.
pub async fn score_pending(
    store: &dyn PipelineStore,
    scorer: &SentimentScorer,
    limit: i64,
) -> Result<ScoreReport> {
    let model = scorer.model_id().to_string();
    let pending = store
        .unscored_articles(&model, limit)
        .await
        .context("Failed to select unscored articles")?;

    if pending.is_empty() {
        tracing::info!("No unscored articles for {}", model);
        return Ok(ScoreReport::default());
    }

    let titles: Vec<String> = pending.iter().map(|a| a.title.clone()).collect();
    let scores = scorer
        .score(&titles)
        .await
        .with_context(|| format!("Sentiment model {} failed", model))?;

    let rows: Vec<ArticleSentiment> = pending
        .iter()
        .zip(scores)
        .map(|(article, s)| ArticleSentiment {
            article_id: article.id,
            model: model.clone(),
            pos: s.positive,
            neg: s.negative,
            neu: s.neutral,
        })
        .collect();

    let inserted = store
        .insert_sentiments(&rows)
        .await
        .context("Failed to store sentiment scores")?;
    tracing::info!("Scored {} articles with {}", pending.len(), model);

    Ok(ScoreReport {
        selected: pending.len(),
        inserted,
    })
}
