use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::SentimentConfig;
use crate::error::{ScorerError, ScorerResult};
use crate::labels::LabelMap;
use crate::provider::SentimentModel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
struct ClassifyRequest<'a> {
    inputs: &'a [String],
    parameters: ClassifyParameters,
}

#[derive(Debug, Clone, Serialize)]
struct ClassifyParameters {
    top_k: usize,
    truncation: bool,
    max_length: usize,
}

/// Classifier served over HTTP with the text-classification response shape
/// `[[{"label": .., "score": ..}, ..], ..]`.
pub struct HttpSentimentModel {
    client: reqwest::Client,
    endpoint: String,
    model_id: String,
    api_token: Option<String>,
    max_length: usize,
    labels: LabelMap,
}

impl HttpSentimentModel {
    /// Build the client and resolve the label map from the model's own configuration.
    pub async fn initialize(config: &SentimentConfig) -> ScorerResult<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let labels = load_label_map(&client, config).await?;

        tracing::info!(
            model = %config.model,
            endpoint = %config.endpoint,
            labels = ?labels.labels(),
            "Sentiment model ready (http)"
        );

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model_id: config.model.clone(),
            api_token: config.api_token.clone(),
            max_length: config.max_length,
            labels,
        })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Read `id2label` from `SENTIMENT_MODEL_DIR/config.json`, or from the hub.
pub async fn load_label_map(client: &reqwest::Client, config: &SentimentConfig) -> ScorerResult<LabelMap> {
    let document: serde_json::Value = match &config.model_dir {
        Some(dir) => {
            let path = dir.join("config.json");
            let raw = tokio::fs::read_to_string(&path).await.map_err(|e| {
                ScorerError::ModelConfig(format!("reading {}: {e}", path.display()))
            })?;
            serde_json::from_str(&raw)?
        }
        None => {
            let url = config.hub_config_url();
            let mut request = client.get(&url);
            if let Some(token) = &config.api_token {
                request = request.bearer_auth(token);
            }
            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(ScorerError::ModelConfig(format!(
                    "GET {url}: HTTP {}",
                    response.status()
                )));
            }
            response.json().await?
        }
    };

    LabelMap::from_model_config(&document)
}

/// Place each reported `(label, score)` at the label's model position.
pub fn place_scores(labels: &LabelMap, results: Vec<Vec<LabelScore>>) -> ScorerResult<Vec<Vec<f64>>> {
    results
        .into_iter()
        .enumerate()
        .map(|(i, entries)| {
            let mut row = vec![f64::NAN; labels.len()];
            for entry in entries {
                let idx = labels.index_of_label(&entry.label).ok_or_else(|| {
                    ScorerError::InvalidResponse(format!(
                        "row {i}: label {:?} is not in the model's id2label",
                        entry.label
                    ))
                })?;
                row[idx] = entry.score;
            }
            if let Some(missing) = row.iter().position(|v| v.is_nan()) {
                return Err(ScorerError::InvalidResponse(format!(
                    "row {i}: no score for label {:?}",
                    labels.labels()[missing]
                )));
            }
            Ok(row)
        })
        .collect()
}

#[async_trait]
impl SentimentModel for HttpSentimentModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn labels(&self) -> &LabelMap {
        &self.labels
    }

    async fn predict_proba(&self, texts: &[String]) -> ScorerResult<Vec<Vec<f64>>> {
        let start = Instant::now();
        let request = ClassifyRequest {
            inputs: texts,
            parameters: ClassifyParameters {
                top_k: self.labels.len(),
                truncation: true,
                max_length: self.max_length,
            },
        };

        let response = self
            .authorize(self.client.post(&self.endpoint))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScorerError::ServiceUnavailable(format!("Status: {} {}", status, body)));
        }

        let results = response.json::<Vec<Vec<LabelScore>>>().await?;
        let rows = place_scores(&self.labels, results)?;

        tracing::debug!(
            texts = texts.len(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Sentiment batch classified"
        );
        Ok(rows)
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
