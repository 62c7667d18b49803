use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ScorerError, ScorerResult};

/// The three semantic classes every headline is scored against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-headline class probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

impl SentimentScores {
    pub fn get(&self, class: Sentiment) -> f64 {
        match class {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
        }
    }

    pub fn sum(&self) -> f64 {
        self.positive + self.negative + self.neutral
    }

    /// Rescale so the three classes sum to 1. `None` if the values cannot form a distribution.
    pub fn normalized(&self) -> Option<Self> {
        let values = [self.positive, self.negative, self.neutral];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return None;
        }
        let total = self.sum();
        if total <= 0.0 {
            return None;
        }
        Some(Self {
            positive: self.positive / total,
            negative: self.negative / total,
            neutral: self.neutral / total,
        })
    }
}

/// Position → label mapping read from a classifier's `id2label` configuration.
///
/// Output rows are always interpreted through this map; no backend may assume
/// that index 0 means any particular class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    labels: Vec<String>,
    positive: usize,
    negative: usize,
    neutral: usize,
}

impl LabelMap {
    /// Build from `(index, label)` pairs. Indices must cover `0..n` exactly once
    /// and the three semantic classes must all be present (case-insensitive).
    pub fn from_pairs<I, S>(pairs: I) -> ScorerResult<Self>
    where
        I: IntoIterator<Item = (i64, S)>,
        S: AsRef<str>,
    {
        let mut entries: Vec<(i64, String)> = pairs
            .into_iter()
            .map(|(i, s)| (i, s.as_ref().trim().to_ascii_lowercase()))
            .collect();
        entries.sort_by_key(|(i, _)| *i);

        for (expected, (idx, label)) in entries.iter().enumerate() {
            if *idx != expected as i64 {
                return Err(ScorerError::ModelConfig(format!(
                    "id2label indices must be contiguous from 0; found {idx} ({label}) at position {expected}"
                )));
            }
        }

        let labels: Vec<String> = entries.into_iter().map(|(_, l)| l).collect();
        let find = |class: Sentiment| {
            labels
                .iter()
                .position(|l| l == class.label())
                .ok_or_else(|| {
                    ScorerError::ModelConfig(format!(
                        "id2label has no '{}' class (labels: {:?})",
                        class, labels
                    ))
                })
        };

        Ok(Self {
            positive: find(Sentiment::Positive)?,
            negative: find(Sentiment::Negative)?,
            neutral: find(Sentiment::Neutral)?,
            labels,
        })
    }

    /// Build from an `id2label` object whose keys are stringified integers.
    pub fn from_id2label(id2label: &HashMap<String, String>) -> ScorerResult<Self> {
        let pairs = id2label
            .iter()
            .map(|(k, v)| {
                k.trim()
                    .parse::<i64>()
                    .map(|i| (i, v.clone()))
                    .map_err(|_| ScorerError::ModelConfig(format!("id2label key {k:?} is not an integer")))
            })
            .collect::<ScorerResult<Vec<_>>>()?;
        Self::from_pairs(pairs)
    }

    /// Read `id2label` out of a HuggingFace-style `config.json` document.
    pub fn from_model_config(config: &serde_json::Value) -> ScorerResult<Self> {
        let raw = config
            .get("id2label")
            .ok_or_else(|| ScorerError::ModelConfig("config has no id2label".into()))?;
        let id2label: HashMap<String, String> = serde_json::from_value(raw.clone())
            .map_err(|e| ScorerError::ModelConfig(format!("id2label is malformed: {e}")))?;
        Self::from_id2label(&id2label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn index_of(&self, class: Sentiment) -> usize {
        match class {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
        }
    }

    /// Position of a raw label as reported by a backend.
    pub fn index_of_label(&self, label: &str) -> Option<usize> {
        let needle = label.trim().to_ascii_lowercase();
        self.labels.iter().position(|l| *l == needle)
    }

    /// Pick the three semantic classes out of one positional output row.
    pub fn project(&self, row: &[f64]) -> SentimentScores {
        SentimentScores {
            positive: row[self.positive],
            negative: row[self.negative],
            neutral: row[self.neutral],
        }
    }
}

/// Numerically stable softmax over one row of logits.
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|x| (x - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn finbert_labels() -> LabelMap {
        LabelMap::from_model_config(&json!({
            "id2label": {"0": "positive", "1": "negative", "2": "neutral"}
        }))
        .unwrap()
    }

    #[test]
    fn resolves_indices_by_name() {
        let labels = finbert_labels();
        assert_eq!(labels.index_of(Sentiment::Positive), 0);
        assert_eq!(labels.index_of(Sentiment::Negative), 1);
        assert_eq!(labels.index_of(Sentiment::Neutral), 2);
        assert_eq!(labels.len(), 3);
    }

    #[test]
    fn permuted_order_projects_to_same_classes() {
        let labels = LabelMap::from_pairs(vec![(0, "Negative"), (1, "NEUTRAL"), (2, "positive")]).unwrap();
        let scores = labels.project(&[0.1, 0.2, 0.7]);
        assert_eq!(scores.positive, 0.7);
        assert_eq!(scores.negative, 0.1);
        assert_eq!(scores.neutral, 0.2);
        assert_eq!(labels.index_of_label(" Positive "), Some(2));
        assert_eq!(labels.index_of_label("bullish"), None);
    }

    #[test]
    fn rejects_missing_class_and_gaps() {
        let missing = LabelMap::from_pairs(vec![(0, "positive"), (1, "negative")]);
        assert!(matches!(missing, Err(ScorerError::ModelConfig(_))));

        let gap = LabelMap::from_pairs(vec![(0, "positive"), (1, "negative"), (3, "neutral")]);
        assert!(matches!(gap, Err(ScorerError::ModelConfig(_))));

        let bad_key = LabelMap::from_model_config(&json!({"id2label": {"zero": "positive"}}));
        assert!(matches!(bad_key, Err(ScorerError::ModelConfig(_))));

        let absent = LabelMap::from_model_config(&json!({"num_labels": 3}));
        assert!(matches!(absent, Err(ScorerError::ModelConfig(_))));
    }

    #[test]
    fn softmax_is_a_distribution() {
        let probs = softmax(&[2.0, -1.0, 0.5]);
        let total: f64 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(probs[0] > probs[2] && probs[2] > probs[1]);

        // Large logits must not overflow.
        let big = softmax(&[1000.0, 999.0, 998.0]);
        assert!(big.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn normalization_rejects_degenerate_rows() {
        let s = SentimentScores { positive: 2.0, negative: 1.0, neutral: 1.0 };
        let n = s.normalized().unwrap();
        assert!((n.sum() - 1.0).abs() < 1e-12);
        assert_eq!(n.positive, 0.5);

        let zero = SentimentScores { positive: 0.0, negative: 0.0, neutral: 0.0 };
        assert!(zero.normalized().is_none());
        let nan = SentimentScores { positive: f64::NAN, negative: 0.5, neutral: 0.5 };
        assert!(nan.normalized().is_none());
    }
}
