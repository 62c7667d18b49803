use async_trait::async_trait;

use crate::config::{Backend, SentimentConfig};
use crate::error::{ScorerError, ScorerResult};
use crate::http::HttpSentimentModel;
use crate::labels::{LabelMap, SentimentScores};

/// Backend-agnostic interface for a three-class headline classifier.
///
/// Implemented by the HTTP client and the PyO3 embedded engine.
#[async_trait]
pub trait SentimentModel: Send + Sync {
    /// Identity stored with every score this model produces.
    fn model_id(&self) -> &str;

    /// Output positions resolved once, when the model was loaded.
    fn labels(&self) -> &LabelMap;

    /// Class probabilities for each text, in the model's positional order.
    async fn predict_proba(&self, texts: &[String]) -> ScorerResult<Vec<Vec<f64>>>;

    /// Release model resources. Further predictions may fail afterwards.
    async fn shutdown(&self) -> ScorerResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str;
}

/// Loaded classifier handle passed into the scoring job.
pub struct SentimentScorer {
    model: Box<dyn SentimentModel>,
}

impl SentimentScorer {
    pub fn new(model: impl SentimentModel + 'static) -> Self {
        Self {
            model: Box::new(model),
        }
    }

    /// Load the backend selected by `config`.
    pub async fn initialize(config: &SentimentConfig) -> ScorerResult<Self> {
        match config.backend {
            Backend::Http => Ok(Self::new(HttpSentimentModel::initialize(config).await?)),
            #[cfg(feature = "embedded")]
            Backend::Embedded => Ok(Self::new(
                crate::embedded::EmbeddedSentimentModel::initialize(config).await?,
            )),
            #[cfg(not(feature = "embedded"))]
            Backend::Embedded => Err(ScorerError::BackendUnavailable(
                "built without the `embedded` feature".into(),
            )),
        }
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    pub fn labels(&self) -> &LabelMap {
        self.model.labels()
    }

    pub fn backend_name(&self) -> &'static str {
        self.model.backend_name()
    }

    /// Score every text in one model call. Each result sums to 1.
    pub async fn score(&self, texts: &[String]) -> ScorerResult<Vec<SentimentScores>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self.model.predict_proba(texts).await?;
        if rows.len() != texts.len() {
            return Err(ScorerError::InvalidResponse(format!(
                "expected {} rows, model returned {}",
                texts.len(),
                rows.len()
            )));
        }

        let labels = self.model.labels();
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                if row.len() != labels.len() {
                    return Err(ScorerError::InvalidResponse(format!(
                        "row {i} has {} values, model has {} labels",
                        row.len(),
                        labels.len()
                    )));
                }
                labels.project(row).normalized().ok_or_else(|| {
                    ScorerError::InvalidResponse(format!("row {i} is not a probability distribution: {row:?}"))
                })
            })
            .collect()
    }

    /// Tear the handle down explicitly.
    pub async fn shutdown(self) -> ScorerResult<()> {
        tracing::debug!(model = self.model.model_id(), "Shutting down sentiment model");
        self.model.shutdown().await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::labels::Sentiment;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Returns fixed rows and counts calls.
    pub struct FixedModel {
        pub labels: LabelMap,
        pub rows: Vec<Vec<f64>>,
        pub calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SentimentModel for FixedModel {
        fn model_id(&self) -> &str {
            "test/fixed"
        }
        fn labels(&self) -> &LabelMap {
            &self.labels
        }
        async fn predict_proba(&self, texts: &[String]) -> ScorerResult<Vec<Vec<f64>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.iter().take(texts.len()).cloned().collect())
        }
        fn backend_name(&self) -> &'static str {
            "fixed"
        }
    }

    fn model(order: [&str; 3], rows: Vec<Vec<f64>>) -> (SentimentScorer, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let labels = LabelMap::from_pairs(order.iter().enumerate().map(|(i, l)| (i as i64, *l))).unwrap();
        let scorer = SentimentScorer::new(FixedModel {
            labels,
            rows,
            calls: calls.clone(),
        });
        (scorer, calls)
    }

    #[tokio::test]
    async fn maps_by_label_name_not_position() {
        let (scorer, _) = model(["neutral", "positive", "negative"], vec![vec![0.2, 0.7, 0.1]]);
        let out = scorer.score(&["Stocks rally".to_string()]).await.unwrap();
        assert_eq!(out.len(), 1);
        assert!((out[0].get(Sentiment::Positive) - 0.7).abs() < 1e-12);
        assert!((out[0].get(Sentiment::Negative) - 0.1).abs() < 1e-12);
        assert!((out[0].get(Sentiment::Neutral) - 0.2).abs() < 1e-12);
    }

    #[tokio::test]
    async fn every_row_sums_to_one() {
        let rows = vec![
            vec![0.333333, 0.333333, 0.333334],
            vec![0.9, 0.05, 0.05000001],
            vec![0.2, 0.2, 0.2],
        ];
        let (scorer, calls) = model(["positive", "negative", "neutral"], rows);
        let texts: Vec<String> = (0..3).map(|i| format!("headline {i}")).collect();
        let out = scorer.score(&texts).await.unwrap();
        assert_eq!(out.len(), 3);
        for s in &out {
            assert!((s.sum() - 1.0).abs() < 1e-5);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1, "whole batch is one model call");
    }

    #[tokio::test]
    async fn empty_batch_skips_the_model() {
        let (scorer, calls) = model(["positive", "negative", "neutral"], vec![]);
        assert!(scorer.score(&[]).await.unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn shape_mismatches_are_errors() {
        let (scorer, _) = model(["positive", "negative", "neutral"], vec![vec![0.5, 0.5]]);
        let err = scorer.score(&["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, ScorerError::InvalidResponse(_)));

        let (scorer, _) = model(["positive", "negative", "neutral"], vec![vec![0.5, 0.25, 0.25]]);
        let err = scorer
            .score(&["x".to_string(), "y".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ScorerError::InvalidResponse(_)));
    }

    #[cfg(not(feature = "embedded"))]
    #[tokio::test]
    async fn embedded_backend_requires_feature() {
        let config = SentimentConfig {
            backend: Backend::Embedded,
            ..SentimentConfig::default()
        };
        let err = SentimentScorer::initialize(&config).await.err().unwrap();
        assert!(matches!(err, ScorerError::BackendUnavailable(_)));
    }
}
