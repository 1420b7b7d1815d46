//! golden-harness: a golden-output regression harness for command-line programs.
//!
//! The harness drives an externally built executable through a declarative
//! matrix of invocations, compares the files it produces byte-for-byte against
//! previously approved "golden" references, and reduces everything to a single
//! pass/fail result with a CI-friendly exit code.
//!
//! # Quick Start
//!
//! ```no_run
//! use golden_harness::builder;
//!
//! # fn main() -> golden_harness::Result<()> {
//! let outcome = builder()
//!     .from_suite("seqan_tcoffee")?
//!     .source_root("/path/to/source")
//!     .binary_root("/path/to/build")
//!     .run()?;
//! std::process::exit(outcome.exit_code());
//! # }
//! ```
//!
//! # Suite manifests
//!
//! ```toml
//! name = "my_tool"
//! program = "my_tool"
//! app-dir = "apps/my_tool"
//! tests-dir = "apps/my_tool/tests"
//! skip-arch = ["mips", "s390"]
//!
//! [[group]]
//! name = "defaults"
//! inputs = ["a", "b"]
//! args = ["-s", "{in:{input}.fa}", "-o", "{out:{input}.fasta}"]
//! compare = [["{in:{input}.fasta}", "{out:{input}.fasta}"]]
//! ```
//!
//! `{in:NAME}` resolves into the source-tree test data directory, `{out:NAME}`
//! into a private temporary directory that is removed after the run.
//!
//! # Architecture
//!
//! The pipeline is `PlatformGate → PathHelper → BinaryLocator → CaseMatrix →
//! SuiteRunner`, built around three traits:
//!
//! - [`BinaryLocator`](locate::BinaryLocator): finds the program under test
//! - [`Executor`](runner::Executor): runs one [`TestCase`](case::TestCase) and judges it
//! - [`Reporter`](harness::Reporter): prints per-case status and the summary
//!
//! # Custom Executor Example
//!
//! ```no_run
//! use golden_harness::case::TestCase;
//! use golden_harness::runner::{ExecutionResult, Executor};
//!
//! struct AlwaysPass;
//!
//! impl Executor for AlwaysPass {
//!     fn run(&self, _case: &TestCase) -> ExecutionResult {
//!         ExecutionResult::passed(0)
//!     }
//!
//!     fn name(&self) -> &str {
//!         "AlwaysPass"
//!     }
//! }
//! ```
//!
//! # Features
//!
//! - `default` - Enables `cli`
//! - `cli` - The `golden-harness` binary

pub mod case;
pub mod compare;
pub mod config;
pub mod core;
pub mod harness;
pub mod locate;
pub mod matrix;
pub mod platform;
pub mod runner;
pub mod suites;

// Re-export commonly used types
pub use crate::core::{Error, Harness, HarnessBuilder, HarnessOutcome, PathHelper, Result};
pub use case::{Comparison, TestCase, Transform};
pub use config::SuiteConfig;
pub use harness::AggregateResult;

/// Create a new harness builder.
///
/// This is the main entry point for the fluent API.
pub fn builder() -> HarnessBuilder {
    HarnessBuilder::new()
}
