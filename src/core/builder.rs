use crate::case::TestCase;
use crate::config::{ConfigLoader, SuiteConfig, WorkingDir};
use crate::core::context::PathHelper;
use crate::core::error::{Error, Result};
use crate::harness::{AggregateResult, ConsoleReporter, Reporter, SuiteRunner};
use crate::locate::{BinaryLocator, BuildLayoutLocator, FixedLocator};
use crate::runner::{Executor, ProcessExecutor};
use std::path::{Path, PathBuf};

/// Builder for configuring and running a golden-output suite.
pub struct HarnessBuilder {
    suite: Option<SuiteConfig>,
    source_root: Option<PathBuf>,
    binary_root: Option<PathBuf>,
    arch: Option<String>,
    temp_parent: Option<PathBuf>,
    locator: Option<Box<dyn BinaryLocator>>,
    executor: Option<Box<dyn Executor>>,
    reporter: Option<Box<dyn Reporter>>,
}

impl HarnessBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            suite: None,
            source_root: None,
            binary_root: None,
            arch: None,
            temp_parent: None,
            locator: None,
            executor: None,
            reporter: None,
        }
    }

    /// Set the suite configuration directly.
    pub fn with_suite(mut self, suite: SuiteConfig) -> Self {
        self.suite = Some(suite);
        self
    }

    /// Load a built-in suite or manifest file, with env overrides applied.
    pub fn from_suite(mut self, name: &str) -> Result<Self> {
        self.suite = Some(ConfigLoader::new(name).load()?);
        Ok(self)
    }

    /// Root of the source tree holding inputs and golden files.
    pub fn source_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_root = Some(path.into());
        self
    }

    /// Root of the build tree holding the program under test.
    pub fn binary_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary_root = Some(path.into());
        self
    }

    /// Architecture identifier fed to the platform gate.
    pub fn arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    /// Create the private temporary directory below `path` instead of the system location.
    pub fn temp_parent(mut self, path: impl Into<PathBuf>) -> Self {
        self.temp_parent = Some(path.into());
        self
    }

    // --- Component Configuration ---

    /// Set a custom binary locator.
    pub fn locator<L: BinaryLocator + 'static>(mut self, locator: L) -> Self {
        self.locator = Some(Box::new(locator));
        self
    }

    /// Use an explicit program path instead of searching the binary root.
    pub fn program(self, path: impl Into<PathBuf>) -> Self {
        self.locator(FixedLocator(path.into()))
    }

    /// Set a custom executor.
    pub fn executor<E: Executor + 'static>(mut self, executor: E) -> Self {
        self.executor = Some(Box::new(executor));
        self
    }

    /// Set a custom reporter.
    pub fn reporter<R: Reporter + 'static>(mut self, reporter: R) -> Self {
        self.reporter = Some(Box::new(reporter));
        self
    }

    // --- Build and Execute ---

    /// Build the harness.
    pub fn build(self) -> Result<Harness> {
        let suite = self.suite.ok_or_else(|| Error::config("no suite configured"))?;

        let source_root = self
            .source_root
            .ok_or_else(|| Error::config("source root not set"))?;

        let binary_root = self
            .binary_root
            .ok_or_else(|| Error::config("binary root not set"))?;

        let arch = self
            .arch
            .or_else(crate::config::env::get_arch_override)
            .unwrap_or_else(|| crate::platform::current_arch().to_string());

        let locator = self
            .locator
            .unwrap_or_else(|| Box::new(BuildLayoutLocator::new()));

        let verbose = suite.run.verbose;
        let reporter = self
            .reporter
            .unwrap_or_else(|| Box::new(ConsoleReporter::stdout().verbose(verbose)));

        Ok(Harness {
            suite,
            source_root,
            binary_root,
            arch,
            temp_parent: self.temp_parent,
            locator,
            executor: self.executor,
            reporter,
        })
    }

    /// Build and immediately run.
    pub fn run(self) -> Result<HarnessOutcome> {
        self.build()?.run()
    }
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// How a harness run ended, short of a fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarnessOutcome {
    /// The platform gate rejected the architecture; nothing ran.
    Skipped { arch: String },
    /// Every case ran.
    Completed(AggregateResult),
}

impl HarnessOutcome {
    /// Process exit code: skipping is success.
    pub fn exit_code(&self) -> i32 {
        match self {
            HarnessOutcome::Skipped { .. } => 0,
            HarnessOutcome::Completed(result) => result.exit_code(),
        }
    }

    pub fn aggregate(&self) -> Option<&AggregateResult> {
        match self {
            HarnessOutcome::Skipped { .. } => None,
            HarnessOutcome::Completed(result) => Some(result),
        }
    }
}

/// A configured suite, ready to run.
pub struct Harness {
    suite: SuiteConfig,
    source_root: PathBuf,
    binary_root: PathBuf,
    arch: String,
    temp_parent: Option<PathBuf>,
    locator: Box<dyn BinaryLocator>,
    executor: Option<Box<dyn Executor>>,
    reporter: Box<dyn Reporter>,
}

impl Harness {
    pub fn suite(&self) -> &SuiteConfig {
        &self.suite
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Whether the platform gate rejects the configured architecture.
    pub fn skipped(&self) -> bool {
        crate::platform::should_skip(&self.arch, &self.suite.skip_arch)
    }

    /// Generate the cases without locating the program or running anything.
    ///
    /// The program is the suite's logical name and output paths point into a
    /// temporary directory that is removed before this returns.
    pub fn plan(&self) -> Result<Vec<TestCase>> {
        let mut paths = self.path_helper()?;
        let program = Path::new(&self.suite.program);
        let cases = crate::matrix::generate_suite(&self.suite, program, &paths);
        release(&mut paths);
        cases
    }

    /// Run the full pipeline: gate, resolve paths, locate, generate, execute, report.
    pub fn run(mut self) -> Result<HarnessOutcome> {
        if self.skipped() {
            tracing::debug!(
                arch = %self.arch,
                suite = %self.suite.name,
                "platform gate skipped suite"
            );
            self.reporter.suite_skipped(&self.suite.name, &self.arch)?;
            return Ok(HarnessOutcome::Skipped { arch: self.arch });
        }

        let mut paths = self.path_helper()?;
        tracing::debug!(temp = %paths.temp_dir().display(), "created temporary directory");

        let result = self.execute(&paths);
        release(&mut paths);
        result.map(HarnessOutcome::Completed)
    }

    fn path_helper(&self) -> Result<PathHelper> {
        match &self.temp_parent {
            Some(parent) => PathHelper::new_in(
                &self.source_root,
                &self.binary_root,
                &self.suite.tests_dir,
                parent,
            ),
            None => PathHelper::new(&self.source_root, &self.binary_root, &self.suite.tests_dir),
        }
    }

    fn execute(&mut self, paths: &PathHelper) -> Result<AggregateResult> {
        let program = self
            .locator
            .locate(paths.binary_root(), &self.suite.app_dir, &self.suite.program)?;
        tracing::debug!(program = %program.display(), "located program under test");

        let cases = crate::matrix::generate_suite(&self.suite, &program, paths)?;

        let default_executor;
        let executor: &dyn Executor = match &self.executor {
            Some(executor) => executor.as_ref(),
            None => {
                let working_dir = match self.suite.run.working_dir {
                    WorkingDir::Temp => paths.temp_dir().to_path_buf(),
                    WorkingDir::Tests => paths.tests_path(),
                };
                default_executor = ProcessExecutor::new(working_dir)
                    .with_stderr(self.suite.run.stderr)
                    .with_timeout(self.suite.run.timeout_duration());
                &default_executor
            }
        };

        self.reporter
            .suite_started(&self.suite.name, &program, cases.len())?;
        SuiteRunner::new(executor, self.reporter.as_mut())
            .jobs(self.suite.run.jobs)
            .run_suite(&cases)
    }
}

/// Remove the temporary directory; failure here never masks the run's result.
fn release(paths: &mut PathHelper) {
    if let Err(e) = paths.delete_temp_dir() {
        tracing::warn!(
            temp = %paths.temp_dir().display(),
            error = %e,
            "failed to remove temporary directory"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{ExecutionResult, Failure};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const SUITE: &str = r#"
        name = "tool"
        program = "tool"
        app-dir = "apps/tool"
        tests-dir = "apps/tool/tests"
        skip-arch = ["mips", "s390"]

        [[group]]
        name = "defaults"
        inputs = ["a", "b", "c"]
        args = ["-s", "{in:{input}.fa}", "-o", "{out:{input}.fasta}"]
        compare = [["{in:{input}.fasta}", "{out:{input}.fasta}"]]
    "#;

    fn suite() -> SuiteConfig {
        SuiteConfig::from_toml_str(SUITE).unwrap()
    }

    /// Counts calls; fails case ids listed in `fail`.
    #[derive(Clone, Default)]
    struct FakeExecutor {
        calls: Arc<AtomicUsize>,
        fail: Vec<String>,
    }

    impl Executor for FakeExecutor {
        fn run(&self, case: &TestCase) -> ExecutionResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.iter().any(|id| id == case.id()) {
                ExecutionResult::failed(
                    Some(0),
                    Failure::MissingOutputFile(case.comparisons()[0].actual().to_path_buf()),
                )
            } else {
                ExecutionResult::passed(0)
            }
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    /// Records the path handed to it and never finds anything.
    struct MissingLocator(Arc<Mutex<bool>>);

    impl BinaryLocator for MissingLocator {
        fn locate(&self, _: &Path, _: &Path, name: &str) -> Result<PathBuf> {
            *self.0.lock().unwrap() = true;
            Err(Error::BinaryNotFound {
                name: name.to_string(),
                searched: vec![PathBuf::from("/build/apps/tool")],
            })
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_builder_error_missing_suite() {
        let result = HarnessBuilder::new()
            .source_root("/src")
            .binary_root("/build")
            .build();
        let err = result.err().expect("should fail");
        assert!(err.to_string().contains("no suite"));
    }

    #[test]
    fn test_builder_error_missing_roots() {
        let err = HarnessBuilder::new()
            .with_suite(suite())
            .binary_root("/build")
            .build()
            .err()
            .expect("should fail");
        assert!(err.to_string().contains("source root"));

        let err = HarnessBuilder::new()
            .with_suite(suite())
            .source_root("/src")
            .build()
            .err()
            .expect("should fail");
        assert!(err.to_string().contains("binary root"));
    }

    #[test]
    fn test_run_all_pass() {
        let tmp = tempfile::tempdir().unwrap();
        let executor = FakeExecutor::default();
        let out = SharedBuf::default();
        let outcome = HarnessBuilder::new()
            .with_suite(suite())
            .source_root("/src")
            .binary_root("/build")
            .arch("x86_64")
            .temp_parent(tmp.path())
            .program("/build/bin/tool")
            .executor(executor.clone())
            .reporter(ConsoleReporter::new(out.clone()))
            .run()
            .unwrap();

        let aggregate = outcome.aggregate().unwrap();
        assert_eq!(aggregate.total, 3);
        assert_eq!(aggregate.failed, 0);
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 3);
        assert!(out.text().contains("tool: 3 tests"));

        // The private temp directory is gone afterwards.
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_run_with_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let executor = FakeExecutor {
            fail: vec!["defaults/b".to_string()],
            ..Default::default()
        };
        let out = SharedBuf::default();
        let outcome = HarnessBuilder::new()
            .with_suite(suite())
            .source_root("/src")
            .binary_root("/build")
            .arch("aarch64")
            .temp_parent(tmp.path())
            .program("/build/bin/tool")
            .executor(executor)
            .reporter(ConsoleReporter::new(out.clone()))
            .run()
            .unwrap();

        let aggregate = outcome.aggregate().unwrap();
        assert_eq!(aggregate.failed, 1);
        assert_eq!(outcome.exit_code(), 1);
        assert!(out.text().contains("case: defaults/b"));
    }

    #[test]
    fn test_skipped_architecture_runs_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let executor = FakeExecutor::default();
        let located = Arc::new(Mutex::new(false));
        let out = SharedBuf::default();
        let outcome = HarnessBuilder::new()
            .with_suite(suite())
            .source_root("/src")
            .binary_root("/build")
            .arch("mips64")
            .temp_parent(tmp.path())
            .locator(MissingLocator(located.clone()))
            .executor(executor.clone())
            .reporter(ConsoleReporter::new(out.clone()))
            .run()
            .unwrap();

        assert_eq!(
            outcome,
            HarnessOutcome::Skipped {
                arch: "mips64".to_string()
            }
        );
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
        assert!(!*located.lock().unwrap());
        assert!(out.text().contains("skipping all tests"));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_binary_not_found_aborts_before_any_case() {
        let tmp = tempfile::tempdir().unwrap();
        let executor = FakeExecutor::default();
        let out = SharedBuf::default();
        let err = HarnessBuilder::new()
            .with_suite(suite())
            .source_root("/src")
            .binary_root("/build")
            .arch("x86_64")
            .temp_parent(tmp.path())
            .locator(MissingLocator(Arc::default()))
            .executor(executor.clone())
            .reporter(ConsoleReporter::new(out.clone()))
            .run()
            .unwrap_err();

        assert!(matches!(err, Error::BinaryNotFound { .. }));
        assert!(err.to_string().contains("/build/apps/tool"));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
        assert!(!out.text().contains("[PASS]"));
        // Temp dir is released on the error path too.
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_plan_lists_cases() {
        let tmp = tempfile::tempdir().unwrap();
        let harness = HarnessBuilder::new()
            .with_suite(suite())
            .source_root("/src")
            .binary_root("/build")
            .arch("x86_64")
            .temp_parent(tmp.path())
            .build()
            .unwrap();
        let cases = harness.plan().unwrap();
        let ids: Vec<&str> = cases.iter().map(TestCase::id).collect();
        assert_eq!(ids, vec!["defaults/a", "defaults/b", "defaults/c"]);
        assert!(cases[0].command_line().starts_with("tool -s /src/apps/tool/tests/a.fa -o "));
    }
}
