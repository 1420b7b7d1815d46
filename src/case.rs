//! The declarative test-case model: what to run and what to verify afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A normalization applied to both sides of a comparison before checking equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Transform {
    /// Rewrite `\r\n` and lone `\r` to `\n`.
    NormalizeLineEndings,
    /// Drop spaces and tabs at the end of every line.
    StripTrailingWhitespace,
    /// Replace every match of a regular expression.
    Replace { pattern: String, with: String },
}

/// One (expected, actual) file pair checked after the program exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    expected: PathBuf,
    actual: PathBuf,
    transforms: Vec<Transform>,
}

impl Comparison {
    /// Byte-for-byte comparison of `actual` against the golden `expected` file.
    pub fn new(expected: impl Into<PathBuf>, actual: impl Into<PathBuf>) -> Self {
        Self {
            expected: expected.into(),
            actual: actual.into(),
            transforms: Vec::new(),
        }
    }

    pub fn with_transforms(mut self, transforms: Vec<Transform>) -> Self {
        self.transforms = transforms;
        self
    }

    pub fn expected(&self) -> &Path {
        &self.expected
    }

    pub fn actual(&self) -> &Path {
        &self.actual
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }
}

/// One verifiable invocation of the program under test.
///
/// Built once with the consuming `with_*`/`compare` methods, then only read.
/// Arguments are kept verbatim and in order; nothing re-tokenizes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    id: String,
    program: PathBuf,
    args: Vec<String>,
    stdin: Option<PathBuf>,
    stdout: Option<PathBuf>,
    stderr: Option<PathBuf>,
    expected_exit_code: i32,
    comparisons: Vec<Comparison>,
}

impl TestCase {
    /// Create a case running `program` with `args`, expecting exit code 0.
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let program = program.into();
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let id = command_line(&program, &args);
        Self {
            id,
            program,
            args,
            stdin: None,
            stdout: None,
            stderr: None,
            expected_exit_code: 0,
            comparisons: Vec::new(),
        }
    }

    /// Set a stable identifier used in reports (defaults to the command line).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Feed the child's standard input from a file.
    pub fn with_stdin(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    /// Capture the child's standard output into a file.
    pub fn with_stdout(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    /// Capture the child's standard error into a file.
    pub fn with_stderr(mut self, path: impl Into<PathBuf>) -> Self {
        self.stderr = Some(path.into());
        self
    }

    pub fn with_expected_exit_code(mut self, code: i32) -> Self {
        self.expected_exit_code = code;
        self
    }

    /// Add a byte-for-byte comparison of `actual` against golden `expected`.
    pub fn compare(self, expected: impl Into<PathBuf>, actual: impl Into<PathBuf>) -> Self {
        self.with_comparison(Comparison::new(expected, actual))
    }

    pub fn with_comparison(mut self, comparison: Comparison) -> Self {
        self.comparisons.push(comparison);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn stdin(&self) -> Option<&Path> {
        self.stdin.as_deref()
    }

    pub fn stdout(&self) -> Option<&Path> {
        self.stdout.as_deref()
    }

    pub fn stderr(&self) -> Option<&Path> {
        self.stderr.as_deref()
    }

    pub fn expected_exit_code(&self) -> i32 {
        self.expected_exit_code
    }

    pub fn comparisons(&self) -> &[Comparison] {
        &self.comparisons
    }

    /// Files this case writes: redirect targets and the actual side of every comparison.
    pub fn outputs(&self) -> impl Iterator<Item = &Path> {
        self.stdout
            .iter()
            .chain(self.stderr.iter())
            .map(PathBuf::as_path)
            .chain(self.comparisons.iter().map(Comparison::actual))
    }

    /// Program file name followed by the arguments, for status lines.
    pub fn command_line(&self) -> String {
        command_line(&self.program, &self.args)
    }
}

fn command_line(program: &Path, args: &[String]) -> String {
    let name = program
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string());
    std::iter::once(name)
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}
