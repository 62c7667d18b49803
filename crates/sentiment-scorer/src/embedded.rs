//! In-process classifier backed by HuggingFace `transformers` through PyO3.
//!
//! The tokenizer and model are loaded once by [`EmbeddedSentimentModel::initialize`]
//! and released by `shutdown`. Python work runs on the blocking pool.

use async_trait::async_trait;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::SentimentConfig;
use crate::error::{ScorerError, ScorerResult};
use crate::labels::{softmax, LabelMap};
use crate::provider::SentimentModel;

struct Loaded {
    tokenizer: Py<PyAny>,
    model: Py<PyAny>,
}

pub struct EmbeddedSentimentModel {
    model_id: String,
    max_length: usize,
    labels: LabelMap,
    loaded: Arc<Mutex<Option<Loaded>>>,
}

fn py_err(context: &'static str) -> impl Fn(PyErr) -> ScorerError {
    move |e| ScorerError::Other(format!("{context}: {e}"))
}

impl EmbeddedSentimentModel {
    pub async fn initialize(config: &SentimentConfig) -> ScorerResult<Self> {
        let model_id = config.model.clone();
        let source = config
            .model_dir
            .clone()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| model_id.clone());
        let max_length = config.max_length;

        tokio::task::spawn_blocking(move || Self::load(model_id, &source, max_length))
            .await
            .map_err(|e| ScorerError::Other(e.to_string()))?
    }

    fn load(model_id: String, source: &str, max_length: usize) -> ScorerResult<Self> {
        // Tokenizers must not fork worker processes from inside the embedding binary.
        std::env::set_var("TOKENIZERS_PARALLELISM", "false");
        setup_python().map_err(py_err("Python setup failed"))?;

        let (loaded, id2label) = Python::attach(|py| -> PyResult<(Loaded, HashMap<i64, String>)> {
            let transformers = py.import("transformers")?;
            let torch = py.import("torch")?;
            torch.call_method1("set_grad_enabled", (false,))?;

            let tokenizer = transformers
                .getattr("AutoTokenizer")?
                .call_method1("from_pretrained", (source,))?;
            let model = transformers
                .getattr("AutoModelForSequenceClassification")?
                .call_method1("from_pretrained", (source,))?;
            model.call_method0("eval")?;

            let id2label: HashMap<i64, String> =
                model.getattr("config")?.getattr("id2label")?.extract()?;

            Ok((
                Loaded {
                    tokenizer: tokenizer.unbind(),
                    model: model.unbind(),
                },
                id2label,
            ))
        })
        .map_err(py_err("Loading transformers model failed"))?;

        let labels = LabelMap::from_pairs(id2label)?;
        tracing::info!(
            model = %model_id,
            labels = ?labels.labels(),
            "Sentiment model ready (embedded)"
        );

        Ok(Self {
            model_id,
            max_length,
            labels,
            loaded: Arc::new(Mutex::new(Some(loaded))),
        })
    }
}

fn predict_logits(loaded: &Loaded, texts: &[String], max_length: usize) -> PyResult<Vec<Vec<f64>>> {
    Python::attach(|py| {
        let kwargs = PyDict::new(py);
        kwargs.set_item("padding", true)?;
        kwargs.set_item("truncation", true)?;
        kwargs.set_item("max_length", max_length)?;
        kwargs.set_item("return_tensors", "pt")?;

        let batch = PyList::new(py, texts)?;
        let encoded = loaded.tokenizer.bind(py).call((batch,), Some(&kwargs))?;
        let inputs: Bound<'_, PyDict> = encoded.getattr("data")?.cast_into()?;

        let output = loaded.model.bind(py).call((), Some(&inputs))?;
        output.getattr("logits")?.call_method0("tolist")?.extract()
    })
}

#[async_trait]
impl SentimentModel for EmbeddedSentimentModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn labels(&self) -> &LabelMap {
        &self.labels
    }

    async fn predict_proba(&self, texts: &[String]) -> ScorerResult<Vec<Vec<f64>>> {
        let loaded = Arc::clone(&self.loaded);
        let texts = texts.to_vec();
        let max_length = self.max_length;

        tokio::task::spawn_blocking(move || {
            let guard = loaded
                .lock()
                .map_err(|e| ScorerError::Other(format!("model lock poisoned: {e}")))?;
            let model = guard.as_ref().ok_or(ScorerError::ModelNotLoaded)?;
            let logits = predict_logits(model, &texts, max_length)
                .map_err(py_err("Classifier forward pass failed"))?;
            Ok(logits.iter().map(|row| softmax(row)).collect())
        })
        .await
        .map_err(|e| ScorerError::Other(e.to_string()))?
    }

    async fn shutdown(&self) -> ScorerResult<()> {
        let taken = self
            .loaded
            .lock()
            .map_err(|e| ScorerError::Other(format!("model lock poisoned: {e}")))?
            .take();
        if let Some(loaded) = taken {
            Python::attach(|py| -> PyResult<()> {
                drop(loaded);
                py.import("gc")?.call_method0("collect")?;
                Ok(())
            })
            .map_err(py_err("Releasing model failed"))?;
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "embedded-pyo3"
    }
}

/// Put an active virtualenv's site-packages on `sys.path`.
fn setup_python() -> PyResult<()> {
    let Ok(venv) = std::env::var("VIRTUAL_ENV") else {
        return Ok(());
    };
    let Some(site_packages) = find_site_packages(Path::new(&venv)) else {
        tracing::warn!("VIRTUAL_ENV={} has no site-packages", venv);
        return Ok(());
    };

    Python::attach(|py| {
        let sys = py.import("sys")?;
        let path: Bound<'_, PyList> = sys.getattr("path")?.cast_into()?;
        let sp = site_packages.to_string_lossy().to_string();
        for item in path.iter() {
            if item.extract::<String>()? == sp {
                return Ok(());
            }
        }
        path.insert(0, &sp)?;
        tracing::info!("Added venv site-packages: {}", sp);
        Ok(())
    })
}

fn find_site_packages(venv: &Path) -> Option<PathBuf> {
    let base = std::fs::canonicalize(venv).unwrap_or_else(|_| venv.to_path_buf());
    // Unix: lib/pythonX.Y/site-packages
    if let Ok(entries) = std::fs::read_dir(base.join("lib")) {
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with("python") {
                let sp = entry.path().join("site-packages");
                if sp.exists() {
                    return Some(sp);
                }
            }
        }
    }
    // Windows: Lib/site-packages
    let sp = base.join("Lib").join("site-packages");
    sp.exists().then_some(sp)
}
