use super::{ExecutionResult, Executor, Failure};
use crate::case::TestCase;
use crate::compare::compare;
use crate::config::StderrPolicy;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Executor that spawns the program under test as a real subprocess.
///
/// The child always runs in `working_dir`, never in whatever directory the
/// harness happened to be started from. Standard input is closed unless the
/// case redirects it.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    working_dir: PathBuf,
    stderr: StderrPolicy,
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    /// Create an executor running children in `working_dir`.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            stderr: StderrPolicy::default(),
            timeout: None,
        }
    }

    /// What to do with stderr of cases that do not redirect it.
    pub fn with_stderr(mut self, stderr: StderrPolicy) -> Self {
        self.stderr = stderr;
        self
    }

    /// Kill children running longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn build_command(&self, case: &TestCase) -> Result<Command, Failure> {
        let mut cmd = Command::new(case.program());
        cmd.args(case.args());
        cmd.current_dir(&self.working_dir);

        match case.stdin() {
            Some(path) => {
                cmd.stdin(open_redirect(path, |p| File::open(p))?);
            }
            None => {
                cmd.stdin(Stdio::null());
            }
        }

        match case.stdout() {
            Some(path) => {
                cmd.stdout(open_redirect(path, |p| File::create(p))?);
            }
            None => {
                cmd.stdout(Stdio::inherit());
            }
        }

        match case.stderr() {
            Some(path) => {
                cmd.stderr(open_redirect(path, |p| File::create(p))?);
            }
            None => {
                cmd.stderr(match self.stderr {
                    StderrPolicy::Inherit => Stdio::inherit(),
                    StderrPolicy::Null => Stdio::null(),
                });
            }
        }

        Ok(cmd)
    }

    /// Spawn and wait, enforcing the timeout if one is set.
    ///
    /// Returns the exit status and whether the child was killed for running too long.
    fn spawn_and_wait(
        &self,
        case: &TestCase,
        mut cmd: Command,
    ) -> Result<(ExitStatus, bool), Failure> {
        let spawn_failure = |e: std::io::Error| Failure::Spawn {
            program: case.program().to_path_buf(),
            message: e.to_string(),
        };

        tracing::debug!(command = ?cmd, cwd = %self.working_dir.display(), "spawning");
        let mut child = cmd.spawn().map_err(spawn_failure)?;

        let Some(timeout) = self.timeout else {
            let status = child.wait().map_err(spawn_failure)?;
            return Ok((status, false));
        };

        // The child is only killed through its own handle, before it is reaped.
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait().map_err(spawn_failure)? {
                return Ok((status, false));
            }
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(program = %case.program().display(), ?timeout, "killing child");
                if let Err(e) = child.kill() {
                    tracing::debug!(error = %e, "kill after timeout failed");
                }
                let status = child.wait().map_err(spawn_failure)?;
                return Ok((status, true));
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }
}

impl Executor for ProcessExecutor {
    fn run(&self, case: &TestCase) -> ExecutionResult {
        let start = Instant::now();

        let cmd = match self.build_command(case) {
            Ok(cmd) => cmd,
            Err(failure) => return ExecutionResult::failed(None, failure),
        };

        let (status, timed_out) = match self.spawn_and_wait(case, cmd) {
            Ok(outcome) => outcome,
            Err(failure) => {
                return ExecutionResult::failed(None, failure).with_duration(start.elapsed());
            }
        };

        let exit_code = status.code();
        if timed_out {
            let after = self.timeout.unwrap_or_default();
            return ExecutionResult::failed(exit_code, Failure::Timeout { after })
                .with_duration(start.elapsed());
        }

        if exit_code != Some(case.expected_exit_code()) {
            return ExecutionResult::failed(
                exit_code,
                Failure::UnexpectedExitStatus {
                    expected: case.expected_exit_code(),
                    actual: exit_code,
                },
            )
            .with_duration(start.elapsed());
        }

        let mut result = ExecutionResult::passed(case.expected_exit_code());
        for (index, comparison) in case.comparisons().iter().enumerate() {
            if let Err(failure) = compare(comparison) {
                result = result.with_comparison_failure(index, failure);
            }
        }
        result.with_duration(start.elapsed())
    }

    fn name(&self) -> &str {
        "process"
    }
}

fn open_redirect<F>(path: &Path, open: F) -> Result<File, Failure>
where
    F: FnOnce(&Path) -> std::io::Result<File>,
{
    open(path).map_err(|e| Failure::Redirect {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
