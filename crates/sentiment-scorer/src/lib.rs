pub mod config;
pub mod error;
pub mod http;
pub mod labels;
pub mod provider;

#[cfg(feature = "embedded")]
pub mod embedded;

pub use config::{Backend, SentimentConfig};
pub use error::{ScorerError, ScorerResult};
pub use http::HttpSentimentModel;
pub use labels::{softmax, LabelMap, Sentiment, SentimentScores};
pub use provider::{SentimentModel, SentimentScorer};

#[cfg(feature = "embedded")]
pub use embedded::EmbeddedSentimentModel;
