//! Executor trait and the per-case result types.

use crate::case::TestCase;
use std::path::PathBuf;
use std::time::Duration;

pub mod process;

pub use process::ProcessExecutor;

/// Runs one test case and judges it.
///
/// Implementations must not panic on case-local problems; every such problem
/// is reported as a [`Failure`] in the returned result.
pub trait Executor: Send + Sync {
    /// Execute `case` and check its exit status and comparisons.
    fn run(&self, case: &TestCase) -> ExecutionResult;

    /// Get a human-readable name for this executor.
    fn name(&self) -> &str;
}

/// Why a single case failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Failure {
    /// The golden reference of a comparison does not exist.
    #[error("missing input file: {}", .0.display())]
    MissingInputFile(PathBuf),

    /// The program did not produce a declared output file.
    #[error("missing output file: {}", .0.display())]
    MissingOutputFile(PathBuf),

    /// Both files exist but differ.
    #[error(
        "content mismatch: {} vs {} (first difference at byte {offset}, lengths {expected_len} vs {actual_len})",
        .expected.display(),
        .actual.display()
    )]
    ContentMismatch {
        expected: PathBuf,
        actual: PathBuf,
        offset: u64,
        expected_len: u64,
        actual_len: u64,
    },

    /// Exit status differed from the expected code. `None` means killed by a signal.
    #[error("unexpected exit status: expected {expected}, got {}", format_code(.actual))]
    UnexpectedExitStatus { expected: i32, actual: Option<i32> },

    /// The process exceeded its time limit and was killed.
    #[error("timed out after {}s", .after.as_secs_f64())]
    Timeout { after: Duration },

    /// The program could not be started.
    #[error("failed to execute {}: {message}", .program.display())]
    Spawn { program: PathBuf, message: String },

    /// A redirect file could not be opened.
    #[error("cannot redirect to {}: {message}", .path.display())]
    Redirect { path: PathBuf, message: String },

    /// A comparison transform could not be built.
    #[error("invalid transform pattern '{pattern}': {message}")]
    InvalidTransform { pattern: String, message: String },

    /// A comparison file exists but could not be read.
    #[error("cannot read {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },
}

fn format_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "termination by signal".to_string(),
    }
}

/// Outcome of executing one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code of the child, if it exited normally.
    pub exit_code: Option<i32>,

    /// Everything that went wrong; empty means the case passed.
    pub failures: Vec<Failure>,

    /// Index into the case's comparisons of the first failing pair, if any.
    pub failed_comparison: Option<usize>,

    /// Wall-clock time from spawn to the end of the last comparison.
    pub duration: Duration,
}

impl ExecutionResult {
    /// Create a passing result with the given exit code.
    pub fn passed(exit_code: i32) -> Self {
        Self {
            exit_code: Some(exit_code),
            failures: Vec::new(),
            failed_comparison: None,
            duration: Duration::ZERO,
        }
    }

    /// Create a result failed for a reason unrelated to comparisons.
    pub fn failed(exit_code: Option<i32>, failure: Failure) -> Self {
        Self {
            exit_code,
            failures: vec![failure],
            failed_comparison: None,
            duration: Duration::ZERO,
        }
    }

    /// Record the failure of the comparison at `index`.
    pub fn with_comparison_failure(mut self, index: usize, failure: Failure) -> Self {
        if self.failed_comparison.is_none() {
            self.failed_comparison = Some(index);
        }
        self.failures.push(failure);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Whether the case passed.
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn timed_out(&self) -> bool {
        self.failures
            .iter()
            .any(|f| matches!(f, Failure::Timeout { .. }))
    }
}
