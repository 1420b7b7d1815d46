//! Suite manifests: TOML descriptions of a program under test and its case matrix.
//!
//! ```toml
//! name = "my_tool"
//! program = "my_tool"
//! app-dir = "apps/my_tool"
//! tests-dir = "apps/my_tool/tests"
//! skip-arch = ["mips", "s390"]
//!
//! [run]
//! timeout = 300
//! working-dir = "temp"
//!
//! [[group]]
//! name = "modes"
//! inputs = ["a", "b"]
//! variants = [
//!     { tag = "mglobal", args = ["-m", "global"] },
//!     { tag = "mlocal", args = ["-m", "local"] },
//! ]
//! args = ["{variant}", "-s", "{in:{input}.fa}", "-o", "{out:{input}.{tag}.fasta}"]
//! compare = [["{in:{input}.{tag}.fasta}", "{out:{input}.{tag}.fasta}"]]
//! ```

use crate::case::Transform;
use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod env;
mod loader;
pub use loader::ConfigLoader;

/// Complete description of one suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SuiteConfig {
    /// Suite name, used in banners and reports.
    pub name: String,

    /// Logical name of the executable under test (no platform suffix).
    pub program: String,

    /// Directory of the program below the binary root.
    pub app_dir: PathBuf,

    /// Directory of inputs and golden files below the source root.
    pub tests_dir: PathBuf,

    /// Architecture prefixes on which the whole suite is skipped.
    #[serde(default)]
    pub skip_arch: Vec<String>,

    /// Execution settings.
    #[serde(default)]
    pub run: RunConfig,

    /// Case groups, expanded in order.
    #[serde(default, rename = "group")]
    pub groups: Vec<GroupConfig>,

    /// Named overlays selected with `GOLDEN_HARNESS_PROFILE`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub profiles: HashMap<String, toml::Value>,
}

/// Execution settings shared by every case of a suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunConfig {
    /// Per-case time limit in seconds; unset means wait indefinitely.
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Number of cases executed concurrently.
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Working directory of every child process.
    #[serde(default)]
    pub working_dir: WorkingDir,

    /// Handling of stderr for cases that do not redirect it.
    #[serde(default)]
    pub stderr: StderrPolicy,

    /// Enable verbose output.
    #[serde(default)]
    pub verbose: bool,
}

fn default_jobs() -> usize {
    1
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            jobs: default_jobs(),
            working_dir: WorkingDir::default(),
            stderr: StderrPolicy::default(),
            verbose: false,
        }
    }
}

impl RunConfig {
    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

/// Working directory of the program under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkingDir {
    /// The suite's private temporary directory.
    #[default]
    Temp,
    /// The source-tree directory holding inputs and golden files.
    Tests,
}

/// Stderr handling for cases without an explicit redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StderrPolicy {
    /// Pass through to the harness's own stderr.
    #[default]
    Inherit,
    /// Discard.
    Null,
}

/// One block of cases: inputs × variants mapped through argument templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GroupConfig {
    /// Group name, the first component of each case id.
    pub name: String,

    /// Values substituted for `{input}`.
    pub inputs: Vec<String>,

    /// Option variants; none means a single variant with no arguments and an empty tag.
    #[serde(default)]
    pub variants: Vec<VariantConfig>,

    /// Argument templates.
    #[serde(default)]
    pub args: Vec<String>,

    /// Stdin redirect template.
    #[serde(default)]
    pub stdin: Option<String>,

    /// Stdout redirect template.
    #[serde(default)]
    pub stdout: Option<String>,

    /// Stderr redirect template.
    #[serde(default)]
    pub stderr: Option<String>,

    /// Expected exit code.
    #[serde(default)]
    pub exit_code: i32,

    /// Comparison templates.
    #[serde(default)]
    pub compare: Vec<CompareConfig>,
}

/// A named set of extra arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantConfig {
    /// Value substituted for `{tag}`.
    pub tag: String,

    /// Arguments substituted for a `{variant}` token.
    #[serde(default)]
    pub args: Vec<String>,
}

/// A comparison template: `[expected, actual]` or a table with transforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompareConfig {
    Pair(String, String),
    Detailed {
        expected: String,
        actual: String,
        #[serde(default)]
        transforms: Vec<Transform>,
    },
}

impl CompareConfig {
    pub fn expected(&self) -> &str {
        match self {
            CompareConfig::Pair(expected, _) => expected,
            CompareConfig::Detailed { expected, .. } => expected,
        }
    }

    pub fn actual(&self) -> &str {
        match self {
            CompareConfig::Pair(_, actual) => actual,
            CompareConfig::Detailed { actual, .. } => actual,
        }
    }

    pub fn transforms(&self) -> &[Transform] {
        match self {
            CompareConfig::Pair(..) => &[],
            CompareConfig::Detailed { transforms, .. } => transforms,
        }
    }
}

impl SuiteConfig {
    /// Parse and validate a manifest.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SuiteConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a manifest file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read suite file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject manifests that could never run correctly.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(invalid("name", &self.name));
        }
        if self.program.trim().is_empty() {
            return Err(invalid("program", &self.program));
        }
        if self.run.jobs == 0 {
            return Err(invalid("run.jobs", "0"));
        }
        if self.run.timeout == Some(0) {
            return Err(invalid("run.timeout", "0"));
        }

        let mut names = std::collections::HashSet::new();
        for group in &self.groups {
            if !names.insert(group.name.as_str()) {
                return Err(Error::config(format!("duplicate group name '{}'", group.name)));
            }
            if group.inputs.is_empty() {
                return Err(Error::config(format!("group '{}' has no inputs", group.name)));
            }
            let mut tags = std::collections::HashSet::new();
            for variant in &group.variants {
                if !tags.insert(variant.tag.as_str()) {
                    return Err(Error::config(format!(
                        "group '{}' repeats variant tag '{}'",
                        group.name, variant.tag
                    )));
                }
            }
            for cmp in &group.compare {
                for transform in cmp.transforms() {
                    if let Transform::Replace { pattern, .. } = transform {
                        regex::bytes::Regex::new(pattern).map_err(|e| {
                            Error::config(format!(
                                "group '{}': invalid transform pattern '{}': {}",
                                group.name, pattern, e
                            ))
                        })?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Number of cases the groups expand to.
    pub fn case_count(&self) -> usize {
        self.groups
            .iter()
            .map(|g| g.inputs.len() * g.variants.len().max(1))
            .sum()
    }
}

fn invalid(field: &str, value: &str) -> Error {
    Error::InvalidConfig {
        field: field.to_string(),
        value: value.to_string(),
    }
}
