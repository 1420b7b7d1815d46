//! Locating the executable under test inside an externally produced build tree.
//!
//! The default search order is documented on [`BuildLayoutLocator`]. Custom
//! layouts implement [`BinaryLocator`] and are handed to the
//! [`HarnessBuilder`](crate::core::HarnessBuilder).

use crate::core::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Build configuration subdirectories, highest precedence first.
///
/// Optimized builds win over debug builds; the empty entry is a
/// single-configuration build that places binaries directly in the base dir.
pub const DEFAULT_CONFIGURATIONS: &[&str] =
    &["Release", "RelWithDebInfo", "MinSizeRel", "", "Debug"];

/// Finds the program under test below a binary root.
pub trait BinaryLocator: Send + Sync {
    /// Resolve `binary_name` below `binary_root/app_dir`.
    fn locate(&self, binary_root: &Path, app_dir: &Path, binary_name: &str) -> Result<PathBuf>;
}

/// Searches conventional build-output layouts.
///
/// Base directories are tried in order `binary_root/app_dir`, `binary_root/bin`,
/// `binary_root`; within each base, the configurations in
/// [`DEFAULT_CONFIGURATIONS`] are tried in order. The first executable in that
/// order wins; further matches are logged and ignored.
#[derive(Debug, Clone)]
pub struct BuildLayoutLocator {
    configurations: Vec<String>,
}

impl BuildLayoutLocator {
    /// Create a locator with the default configuration precedence.
    pub fn new() -> Self {
        Self {
            configurations: DEFAULT_CONFIGURATIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the configuration precedence list.
    pub fn with_configurations<I, S>(mut self, configurations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.configurations = configurations.into_iter().map(Into::into).collect();
        self
    }

    /// Every directory probed for `app_dir`, in precedence order.
    pub fn search_dirs(&self, binary_root: &Path, app_dir: &Path) -> Vec<PathBuf> {
        let bases = [
            binary_root.join(app_dir),
            binary_root.join("bin"),
            binary_root.to_path_buf(),
        ];

        let mut dirs: Vec<PathBuf> = Vec::new();
        for base in &bases {
            for config in &self.configurations {
                let dir = if config.is_empty() {
                    base.clone()
                } else {
                    base.join(config)
                };
                if !dirs.contains(&dir) {
                    dirs.push(dir);
                }
            }
        }
        dirs
    }
}

impl Default for BuildLayoutLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryLocator for BuildLayoutLocator {
    fn locate(&self, binary_root: &Path, app_dir: &Path, binary_name: &str) -> Result<PathBuf> {
        let file_name = format!("{binary_name}{}", std::env::consts::EXE_SUFFIX);
        let searched = self.search_dirs(binary_root, app_dir);

        let candidates: Vec<PathBuf> = searched
            .iter()
            .map(|dir| dir.join(&file_name))
            .filter(|path| {
                let hit = is_executable(path);
                tracing::debug!(path = %path.display(), hit, "probing for binary");
                hit
            })
            .collect();

        match candidates.split_first() {
            None => Err(Error::BinaryNotFound {
                name: binary_name.to_string(),
                searched,
            }),
            Some((chosen, rest)) => {
                if !rest.is_empty() {
                    tracing::warn!(
                        chosen = %chosen.display(),
                        ignored = ?rest,
                        "multiple builds of '{}' found, using highest precedence",
                        binary_name
                    );
                }
                Ok(chosen.clone())
            }
        }
    }
}

/// Always returns the same path, e.g. from an explicit `--program` flag.
#[derive(Debug, Clone)]
pub struct FixedLocator(pub PathBuf);

impl BinaryLocator for FixedLocator {
    fn locate(&self, _binary_root: &Path, _app_dir: &Path, _binary_name: &str) -> Result<PathBuf> {
        Ok(self.0.clone())
    }
}

/// Check that `path` is a regular file the current user could execute.
pub fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        true
    }
}
