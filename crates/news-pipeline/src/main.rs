//! pipeline: run article ingest, sentiment scoring and price ingest in order.
//!
//! Each step is a sibling binary. The first failing step stops the run and
//! its exit code becomes ours.

use anyhow::Result;
use news_pipeline::{init_tracing, run_pipeline, PipelineOutcome, ProcessRunner, PIPELINE_STEPS};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let runner = ProcessRunner::beside_current_exe()?;
    match run_pipeline(&runner, &PIPELINE_STEPS)? {
        PipelineOutcome::Completed => Ok(()),
        PipelineOutcome::Failed { step, code } => {
            tracing::error!("[Pipeline] Aborting after {} failed", step.label);
            std::process::exit(code);
        }
    }
}
