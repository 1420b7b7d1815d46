//! Suite execution and result aggregation.
//!
//! The harness sits after case generation in the pipeline:
//! `PlatformGate → PathHelper → BinaryLocator → CaseMatrix → SuiteRunner`.
//! The runner feeds each case to an [`Executor`], streams one status line per
//! case to a [`Reporter`], and tallies the outcome.

mod formatter;

pub use formatter::{ConsoleReporter, Reporter};

use crate::case::TestCase;
use crate::core::error::Result;
use crate::runner::{ExecutionResult, Executor};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;

/// Reported outcome of one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseOutcome {
    /// Case identifier.
    pub id: String,
    /// Program name and arguments.
    pub command: String,
    pub passed: bool,
    /// Rendered failure reasons; empty when passed.
    pub failures: Vec<String>,
}

impl CaseOutcome {
    pub fn new(case: &TestCase, result: &ExecutionResult) -> Self {
        Self {
            id: case.id().to_string(),
            command: case.command_line(),
            passed: result.success(),
            failures: result.failures.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Aggregated suite result, in case declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateResult {
    pub total: usize,
    pub failed: usize,
    pub outcomes: Vec<CaseOutcome>,
}

impl AggregateResult {
    pub fn from_outcomes(outcomes: Vec<CaseOutcome>) -> Self {
        let failed = outcomes.iter().filter(|o| !o.passed).count();
        Self {
            total: outcomes.len(),
            failed,
            outcomes,
        }
    }

    /// Number of passed cases.
    pub fn passed(&self) -> usize {
        self.total - self.failed
    }

    /// True only when no case failed.
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// Process exit code: `0` on success, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.success() { 0 } else { 1 }
    }

    /// Write the result as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Runs cases through an executor and reports each one as it completes.
pub struct SuiteRunner<'a> {
    executor: &'a dyn Executor,
    reporter: &'a mut dyn Reporter,
    jobs: usize,
}

impl<'a> SuiteRunner<'a> {
    pub fn new(executor: &'a dyn Executor, reporter: &'a mut dyn Reporter) -> Self {
        Self {
            executor,
            reporter,
            jobs: 1,
        }
    }

    /// Number of cases run concurrently; `0` is treated as `1`.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Run every case, print the summary and return the tally.
    ///
    /// Status lines stream in completion order; the returned outcomes are
    /// always in declaration order.
    pub fn run_suite(&mut self, cases: &[TestCase]) -> Result<AggregateResult> {
        tracing::debug!(
            executor = self.executor.name(),
            cases = cases.len(),
            jobs = self.jobs,
            "running suite"
        );

        let results = if self.jobs == 1 || cases.len() < 2 {
            self.run_sequential(cases)?
        } else {
            self.run_parallel(cases)?
        };

        let outcomes = cases
            .iter()
            .zip(&results)
            .map(|(case, result)| CaseOutcome::new(case, result))
            .collect();
        let aggregate = AggregateResult::from_outcomes(outcomes);
        self.reporter.suite_finished(&aggregate)?;
        Ok(aggregate)
    }

    fn run_sequential(&mut self, cases: &[TestCase]) -> Result<Vec<ExecutionResult>> {
        let mut results = Vec::with_capacity(cases.len());
        for case in cases {
            let result = self.executor.run(case);
            self.reporter.case_finished(case, &result)?;
            results.push(result);
        }
        Ok(results)
    }

    fn run_parallel(&mut self, cases: &[TestCase]) -> Result<Vec<ExecutionResult>> {
        let executor = self.executor;
        let reporter = &mut *self.reporter;
        let workers = self.jobs.min(cases.len());
        let next = AtomicUsize::new(0);
        let mut slots: Vec<Option<ExecutionResult>> = (0..cases.len()).map(|_| None).collect();

        std::thread::scope(|scope| -> Result<()> {
            let (tx, rx) = mpsc::channel();
            for _ in 0..workers {
                let tx = tx.clone();
                let next = &next;
                scope.spawn(move || {
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(case) = cases.get(index) else {
                            break;
                        };
                        if tx.send((index, executor.run(case))).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            for (index, result) in rx {
                reporter.case_finished(&cases[index], &result)?;
                slots[index] = Some(result);
            }
            Ok(())
        })?;

        // Every index was handed out exactly once and its result received.
        Ok(slots.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::Failure;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Passes cases whose first argument is "ok", fails the rest.
    struct FakeExecutor {
        calls: Mutex<Vec<String>>,
        delay: Duration,
    }

    impl FakeExecutor {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            }
        }
    }

    impl Executor for FakeExecutor {
        fn run(&self, case: &TestCase) -> ExecutionResult {
            std::thread::sleep(self.delay);
            self.calls.lock().unwrap().push(case.id().to_string());
            if case.args().first().map(String::as_str) == Some("ok") {
                ExecutionResult::passed(0)
            } else {
                ExecutionResult::failed(
                    Some(0),
                    Failure::MissingOutputFile(PathBuf::from("/t/out")),
                )
            }
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn cases(args: &[&str]) -> Vec<TestCase> {
        args.iter()
            .enumerate()
            .map(|(i, a)| TestCase::new("/bin/tool", [*a]).with_id(format!("case{i}")))
            .collect()
    }

    #[test]
    fn test_run_suite_counts() {
        let executor = FakeExecutor::new();
        let mut reporter = ConsoleReporter::new(Vec::new());
        let result = SuiteRunner::new(&executor, &mut reporter)
            .run_suite(&cases(&["ok", "bad", "ok"]))
            .unwrap();

        assert_eq!(result.total, 3);
        assert_eq!(result.failed, 1);
        assert_eq!(result.passed(), 2);
        assert_eq!(result.total, result.failed + result.passed());
        assert!(!result.success());
        assert_eq!(result.exit_code(), 1);
        assert_eq!(result.outcomes[1].failures, vec!["missing output file: /t/out"]);

        let text = String::from_utf8(reporter.into_inner()).unwrap();
        let status: Vec<&str> = text.lines().filter(|l| l.starts_with('[')).collect();
        assert_eq!(status, vec!["[PASS] tool ok", "[FAIL] tool bad", "[PASS] tool ok"]);
    }

    #[test]
    fn test_run_suite_sequential_order() {
        let executor = FakeExecutor::new();
        let mut reporter = ConsoleReporter::new(Vec::new());
        SuiteRunner::new(&executor, &mut reporter)
            .run_suite(&cases(&["ok", "ok", "ok"]))
            .unwrap();
        assert_eq!(
            *executor.calls.lock().unwrap(),
            vec!["case0", "case1", "case2"]
        );
    }

    #[test]
    fn test_run_suite_empty() {
        let executor = FakeExecutor::new();
        let mut reporter = ConsoleReporter::new(Vec::new());
        let result = SuiteRunner::new(&executor, &mut reporter)
            .run_suite(&[])
            .unwrap();
        assert_eq!(result.total, 0);
        assert!(result.success());
        assert_eq!(result.exit_code(), 0);
    }

    #[test]
    fn test_run_suite_parallel_restores_order() {
        let mut executor = FakeExecutor::new();
        executor.delay = Duration::from_millis(5);
        let mut reporter = ConsoleReporter::new(Vec::new());
        let args = ["ok", "bad", "ok", "ok", "bad", "ok", "ok", "ok"];
        let result = SuiteRunner::new(&executor, &mut reporter)
            .jobs(4)
            .run_suite(&cases(&args))
            .unwrap();

        assert_eq!(result.total, 8);
        assert_eq!(result.failed, 2);
        let ids: Vec<&str> = result.outcomes.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["case0", "case1", "case2", "case3", "case4", "case5", "case6", "case7"]
        );
        assert!(!result.outcomes[1].passed);
        assert!(!result.outcomes[4].passed);
        assert_eq!(executor.calls.lock().unwrap().len(), 8);

        let text = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with('[')).count(), 8);
    }

    #[test]
    fn test_jobs_zero_is_sequential() {
        let executor = FakeExecutor::new();
        let mut reporter = ConsoleReporter::new(Vec::new());
        let result = SuiteRunner::new(&executor, &mut reporter)
            .jobs(0)
            .run_suite(&cases(&["ok"]))
            .unwrap();
        assert!(result.success());
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let result = AggregateResult::from_outcomes(vec![CaseOutcome {
            id: "g/a".into(),
            command: "tool a".into(),
            passed: false,
            failures: vec!["timed out after 1s".into()],
        }]);
        result.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["total"], 1);
        assert_eq!(value["failed"], 1);
        assert_eq!(value["outcomes"][0]["id"], "g/a");
        assert_eq!(value["outcomes"][0]["failures"][0], "timed out after 1s");
    }
}
