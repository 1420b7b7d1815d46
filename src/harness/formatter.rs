//! Terminal output for suite runs.

use std::io::{self, Write};
use std::path::Path;

use super::AggregateResult;
use crate::case::TestCase;
use crate::runner::ExecutionResult;

const RULE: &str =
    "==============================================================================";

/// Receives progress events from a [`SuiteRunner`](super::SuiteRunner).
///
/// Events arrive on a single thread, in completion order.
pub trait Reporter: Send {
    /// Printed once before the first case.
    fn suite_started(&mut self, suite: &str, program: &Path, total: usize) -> io::Result<()>;

    /// Printed as soon as a case completes.
    fn case_finished(&mut self, case: &TestCase, result: &ExecutionResult) -> io::Result<()>;

    /// Printed once after the last case.
    fn suite_finished(&mut self, result: &AggregateResult) -> io::Result<()>;

    /// Printed instead of everything else when the platform gate skips the suite.
    fn suite_skipped(&mut self, suite: &str, arch: &str) -> io::Result<()>;
}

/// Formats and prints suite results as plain text.
///
/// Every case gets one `[PASS]`/`[FAIL]` line; details are printed for failed
/// cases only.
pub struct ConsoleReporter<W: Write + Send> {
    out: W,
    verbose: bool,
}

impl ConsoleReporter<io::Stdout> {
    /// Reporter writing to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            verbose: false,
        }
    }

    /// Also print case ids and durations.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Reporter for ConsoleReporter<W> {
    fn suite_started(&mut self, suite: &str, program: &Path, total: usize) -> io::Result<()> {
        writeln!(self.out, "{RULE}")?;
        writeln!(self.out, "{suite}: {total} tests")?;
        writeln!(self.out, "program: {}", program.display())?;
        writeln!(self.out, "{RULE}")?;
        self.out.flush()
    }

    fn case_finished(&mut self, case: &TestCase, result: &ExecutionResult) -> io::Result<()> {
        let marker = if result.success() { "PASS" } else { "FAIL" };
        writeln!(self.out, "[{marker}] {}", case.command_line())?;

        if self.verbose {
            writeln!(
                self.out,
                "       {} ({:.2}s)",
                case.id(),
                result.duration.as_secs_f64()
            )?;
        }

        if !result.success() {
            if !self.verbose {
                writeln!(self.out, "       case: {}", case.id())?;
            }
            if let Some(index) = result.failed_comparison {
                if let Some(cmp) = case.comparisons().get(index) {
                    writeln!(
                        self.out,
                        "       pair #{index}: {} vs {}",
                        cmp.expected().display(),
                        cmp.actual().display()
                    )?;
                }
            }
            for failure in &result.failures {
                writeln!(self.out, "       {failure}")?;
            }
        }
        self.out.flush()
    }

    fn suite_finished(&mut self, result: &AggregateResult) -> io::Result<()> {
        writeln!(self.out, "{RULE}")?;
        writeln!(self.out, "{:>20}: {}", "total tests", result.total)?;
        writeln!(self.out, "{:>20}: {}", "failed tests", result.failed)?;
        writeln!(self.out, "{:>20}: {}", "successful tests", result.passed())?;
        writeln!(self.out, "{RULE}")?;
        self.out.flush()
    }

    fn suite_skipped(&mut self, suite: &str, arch: &str) -> io::Result<()> {
        writeln!(
            self.out,
            "{suite}: skipping all tests, architecture '{arch}' is not supported"
        )?;
        self.out.flush()
    }
}
