//! Runs the three jobs in order as child processes.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub label: &'static str,
    pub program: &'static str,
}

pub const PIPELINE_STEPS: [Step; 3] = [
    Step {
        label: "Articles (GDELT)",
        program: "ingest-articles",
    },
    Step {
        label: "Sentiment scoring",
        program: "score-sentiment",
    },
    Step {
        label: "Prices",
        program: "ingest-prices",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed,
    /// `code` is the step's exit status, 1 when it was killed by a signal.
    Failed { step: Step, code: i32 },
}

pub trait StepRunner {
    fn is_available(&self, step: &Step) -> bool;

    /// Run to completion and return the exit code.
    fn run(&self, step: &Step) -> Result<i32>;
}

/// Runs steps as sibling executables of the current binary.
pub struct ProcessRunner {
    bin_dir: PathBuf,
}

impl ProcessRunner {
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
        }
    }

    pub fn beside_current_exe() -> Result<Self> {
        let exe = std::env::current_exe().context("Cannot locate the pipeline executable")?;
        let dir = exe
            .parent()
            .context("Pipeline executable has no parent directory")?;
        Ok(Self::new(dir))
    }

    fn path_of(&self, step: &Step) -> PathBuf {
        self.bin_dir
            .join(format!("{}{}", step.program, std::env::consts::EXE_SUFFIX))
    }
}

impl StepRunner for ProcessRunner {
    fn is_available(&self, step: &Step) -> bool {
        self.path_of(step).is_file()
    }

    fn run(&self, step: &Step) -> Result<i32> {
        let path = self.path_of(step);
        let status = Command::new(&path)
            .status()
            .with_context(|| format!("Failed to start {}", path.display()))?;
        Ok(status.code().unwrap_or(1))
    }
}

/// Check every program up front, then run steps until one exits non-zero.
pub fn run_pipeline(runner: &dyn StepRunner, steps: &[Step]) -> Result<PipelineOutcome> {
    if let Some(missing) = steps.iter().find(|s| !runner.is_available(s)) {
        bail!("Required program not found: {}", missing.program);
    }

    for step in steps {
        tracing::info!("[Pipeline] Starting: {}", step.label);
        let code = runner.run(step)?;
        if code != 0 {
            tracing::error!("[Pipeline] Failed: {} (exit code {})", step.label, code);
            return Ok(PipelineOutcome::Failed { step: *step, code });
        }
        tracing::info!("[Pipeline] Finished: {}", step.label);
    }

    tracing::info!("[Pipeline] All steps completed");
    Ok(PipelineOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct FakeRunner {
        missing: Vec<&'static str>,
        codes: HashMap<&'static str, i32>,
        ran: RefCell<Vec<&'static str>>,
    }

    impl FakeRunner {
        fn new(codes: &[(&'static str, i32)]) -> Self {
            Self {
                missing: Vec::new(),
                codes: codes.iter().copied().collect(),
                ran: RefCell::new(Vec::new()),
            }
        }
    }

    impl StepRunner for FakeRunner {
        fn is_available(&self, step: &Step) -> bool {
            !self.missing.contains(&step.program)
        }

        fn run(&self, step: &Step) -> Result<i32> {
            self.ran.borrow_mut().push(step.program);
            Ok(self.codes.get(step.program).copied().unwrap_or(0))
        }
    }

    #[test]
    fn runs_in_order() {
        let runner = FakeRunner::new(&[]);
        let outcome = run_pipeline(&runner, &PIPELINE_STEPS).unwrap();
        assert_eq!(outcome, PipelineOutcome::Completed);
        assert_eq!(
            *runner.ran.borrow(),
            vec!["ingest-articles", "score-sentiment", "ingest-prices"]
        );
    }

    #[test]
    fn failure_stops_later_steps_and_keeps_the_code() {
        let runner = FakeRunner::new(&[("score-sentiment", 3)]);
        let outcome = run_pipeline(&runner, &PIPELINE_STEPS).unwrap();

        assert_eq!(
            outcome,
            PipelineOutcome::Failed {
                step: PIPELINE_STEPS[1],
                code: 3
            }
        );
        assert_eq!(*runner.ran.borrow(), vec!["ingest-articles", "score-sentiment"]);
    }

    #[test]
    fn missing_program_fails_before_anything_runs() {
        let mut runner = FakeRunner::new(&[]);
        runner.missing.push("ingest-prices");

        let err = run_pipeline(&runner, &PIPELINE_STEPS).unwrap_err();
        assert!(err.to_string().contains("Required program not found: ingest-prices"));
        assert!(runner.ran.borrow().is_empty());
    }

    #[test]
    fn process_runner_reports_missing_binaries() {
        let dir = std::env::temp_dir().join("news-pipeline-no-such-dir");
        let runner = ProcessRunner::new(&dir);
        assert!(!runner.is_available(&PIPELINE_STEPS[0]));
    }
}
