use std::path::PathBuf;

/// Result type alias for golden-harness operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that stop a suite before or outside of case execution.
///
/// Anything that goes wrong inside a single case is a
/// [`Failure`](crate::runner::Failure) instead and never aborts the suite.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No executable matched the logical program name.
    #[error("binary '{name}' not found; searched: {}", format_searched(.searched))]
    BinaryNotFound { name: String, searched: Vec<PathBuf> },

    /// The private temporary directory could not be created.
    #[error("temporary directory error: {0}")]
    TempDir(#[source] std::io::Error),

    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Argument or path template errors.
    #[error("Template error: {0}")]
    Template(String),

    /// Two generated cases would write the same output file.
    #[error("duplicate output path in suite: {}", .0.display())]
    DuplicateOutput(PathBuf),

    /// A case would write outside the private temporary directory.
    #[error("{case}: output path outside the temporary directory: {}", .path.display())]
    OutputOutsideTemp { case: String, path: PathBuf },

    /// A case would write to a file that another comparison treats as golden.
    #[error("{case}: output path is a golden reference: {}", .path.display())]
    OutputIsGolden { case: String, path: PathBuf },

    /// Suite name is neither built in nor an existing manifest file.
    #[error("unknown suite '{0}'")]
    UnknownSuite(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {field}: {value}")]
    InvalidConfig { field: String, value: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization error.
    #[error("TOML parsing error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_searched(searched: &[PathBuf]) -> String {
    if searched.is_empty() {
        return "(nothing)".to_string();
    }
    searched
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a template error.
    pub fn template(msg: impl Into<String>) -> Self {
        Error::Template(msg.into())
    }
}
