//! Headline sentiment pipeline jobs.
//!
//! Each job is a library function over trait objects (article search, price
//! source, store, scorer) so the binaries stay thin and the jobs can run
//! against in-memory fakes.

pub mod articles;
pub mod driver;
pub mod prices;
pub mod scoring;
pub mod telemetry;

pub use articles::{article_from_raw, ingest_articles, to_published_at, upsert_articles, IngestReport};
pub use driver::{run_pipeline, PipelineOutcome, ProcessRunner, Step, StepRunner, PIPELINE_STEPS};
pub use prices::ingest_prices;
pub use scoring::{score_pending, ScoreReport};
pub use telemetry::init_tracing;
