use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ScorerError, ScorerResult};

pub const DEFAULT_MODEL: &str = "ProsusAI/finbert";
pub const DEFAULT_MAX_LENGTH: usize = 128;
pub const DEFAULT_HUB_URL: &str = "https://huggingface.co";
const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co/models";

/// Which implementation of the classifier to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Remote text-classification endpoint.
    Http,
    /// In-process transformers model via PyO3 (`embedded` feature).
    Embedded,
}

impl FromStr for Backend {
    type Err = ScorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Backend::Http),
            "embedded" | "pyo3" => Ok(Backend::Embedded),
            other => Err(ScorerError::Config(format!(
                "SENTIMENT_BACKEND must be 'http' or 'embedded', got {other:?}"
            ))),
        }
    }
}

/// Classifier settings
#[derive(Debug, Clone)]
pub struct SentimentConfig {
    /// Model identity; also the value written to `article_sentiment.model`.
    pub model: String,
    pub max_length: usize,
    pub backend: Backend,
    /// Text-classification endpoint used by the HTTP backend.
    pub endpoint: String,
    pub hub_url: String,
    /// Local directory holding the model's `config.json` (and weights for the
    /// embedded backend). When set, the hub is not contacted for labels.
    pub model_dir: Option<PathBuf>,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_length: DEFAULT_MAX_LENGTH,
            backend: Backend::Http,
            endpoint: format!("{}/{}", DEFAULT_INFERENCE_URL, DEFAULT_MODEL),
            hub_url: DEFAULT_HUB_URL.to_string(),
            model_dir: None,
            api_token: None,
            timeout: Duration::from_secs(60),
        }
    }
}

impl SentimentConfig {
    pub fn from_env() -> ScorerResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ScorerResult<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let model = get("SENTIMENT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let max_length = match get("SENTIMENT_MAX_LENGTH") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                ScorerError::Config(format!("SENTIMENT_MAX_LENGTH {raw:?}: {e}"))
            })?,
            None => DEFAULT_MAX_LENGTH,
        };
        if max_length == 0 {
            return Err(ScorerError::Config("SENTIMENT_MAX_LENGTH must be positive".into()));
        }
        let backend = match get("SENTIMENT_BACKEND") {
            Some(raw) => raw.parse()?,
            None => Backend::Http,
        };
        let endpoint = get("SENTIMENT_ENDPOINT")
            .unwrap_or_else(|| format!("{}/{}", DEFAULT_INFERENCE_URL, model));

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            hub_url: get("SENTIMENT_HUB_URL")
                .unwrap_or_else(|| DEFAULT_HUB_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model_dir: get("SENTIMENT_MODEL_DIR").map(PathBuf::from),
            api_token: get("HF_API_TOKEN"),
            model,
            max_length,
            backend,
            ..Self::default()
        })
    }

    /// Where the model's `config.json` lives on the hub.
    pub fn hub_config_url(&self) -> String {
        format!("{}/{}/resolve/main/config.json", self.hub_url, self.model)
    }
}
