use crate::core::error::{Error, Result};
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;

const TEMP_PREFIX: &str = "golden-harness-";

/// Per-suite path resolution state.
///
/// Inputs and golden references resolve under `source_root/tests_dir`, generated
/// outputs under a private temporary directory that is unique per run. The
/// temporary directory is created at construction and removed by
/// [`delete_temp_dir`](Self::delete_temp_dir), or on drop if that was never called.
pub struct PathHelper {
    source_root: PathBuf,
    binary_root: PathBuf,
    tests_dir: PathBuf,
    temp_path: PathBuf,
    temp: Option<TempDir>,
}

impl PathHelper {
    /// Create a helper with its temporary directory in the system temp location.
    pub fn new(
        source_root: impl Into<PathBuf>,
        binary_root: impl Into<PathBuf>,
        tests_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir()
            .map_err(Error::TempDir)?;
        Ok(Self::with_temp(source_root, binary_root, tests_dir, temp))
    }

    /// Create a helper whose temporary directory lives under `parent`.
    pub fn new_in(
        source_root: impl Into<PathBuf>,
        binary_root: impl Into<PathBuf>,
        tests_dir: impl Into<PathBuf>,
        parent: &Path,
    ) -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir_in(parent)
            .map_err(Error::TempDir)?;
        Ok(Self::with_temp(source_root, binary_root, tests_dir, temp))
    }

    fn with_temp(
        source_root: impl Into<PathBuf>,
        binary_root: impl Into<PathBuf>,
        tests_dir: impl Into<PathBuf>,
        temp: TempDir,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            binary_root: binary_root.into(),
            tests_dir: tests_dir.into(),
            temp_path: temp.path().to_path_buf(),
            temp: Some(temp),
        }
    }

    /// Map a logical input name into the source-tree test data directory.
    ///
    /// Existence is not checked here; a missing file surfaces at compare time.
    pub fn in_file(&self, name: &str) -> PathBuf {
        self.tests_path().join(name)
    }

    /// Map a logical output name into the private temporary directory.
    ///
    /// `name` must be relative and must not contain `..`, so the result always
    /// lies inside the temporary directory.
    pub fn out_file(&self, name: &str) -> Result<PathBuf> {
        let mut named = false;
        for component in Path::new(name).components() {
            match component {
                Component::Normal(_) => named = true,
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(Error::template(format!(
                        "output name '{name}' escapes the temporary directory"
                    )));
                }
            }
        }
        if !named {
            return Err(Error::template(format!("invalid output name '{name}'")));
        }
        Ok(self.temp_path.join(name))
    }

    /// Recursively remove the temporary directory.
    ///
    /// Calling this more than once, or after the directory vanished on its own,
    /// is a no-op.
    pub fn delete_temp_dir(&mut self) -> std::io::Result<()> {
        let Some(temp) = self.temp.take() else {
            return Ok(());
        };
        match temp.close() {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    /// Source-tree directory holding inputs and golden files.
    pub fn tests_path(&self) -> PathBuf {
        self.source_root.join(&self.tests_dir)
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn binary_root(&self) -> &Path {
        &self.binary_root
    }

    /// Path of the temporary directory, whether or not it still exists.
    pub fn temp_dir(&self) -> &Path {
        &self.temp_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_helper(parent: &Path) -> PathHelper {
        PathHelper::new_in("/src", "/build", "apps/tool/tests", parent).unwrap()
    }

    #[test]
    fn test_in_file_resolves_under_tests_dir() {
        let dir = tempfile::tempdir().unwrap();
        let ph = make_helper(dir.path());
        assert_eq!(
            ph.in_file("1aab.fa"),
            PathBuf::from("/src/apps/tool/tests/1aab.fa")
        );
        assert_eq!(ph.tests_path(), PathBuf::from("/src/apps/tool/tests"));
    }

    #[test]
    fn test_in_file_does_not_check_existence() {
        let dir = tempfile::tempdir().unwrap();
        let ph = make_helper(dir.path());
        let path = ph.in_file("does-not-exist.fa");
        assert!(!path.exists());
    }

    #[test]
    fn test_out_file_resolves_under_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let ph = make_helper(dir.path());
        let out = ph.out_file("1aab.fasta").unwrap();
        assert!(out.starts_with(dir.path()));
        assert!(out.starts_with(ph.temp_dir()));
        assert!(ph.temp_dir().is_dir());
        assert!(
            ph.temp_dir()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(TEMP_PREFIX)
        );
    }

    #[test]
    fn test_out_file_allows_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let ph = make_helper(dir.path());
        let out = ph.out_file("logs/./1aab.err").unwrap();
        assert!(out.starts_with(ph.temp_dir()));
    }

    #[test]
    fn test_out_file_rejects_escaping_names() {
        let dir = tempfile::tempdir().unwrap();
        let ph = make_helper(dir.path());
        for name in ["/etc/escaped", "../escaped", "a/../../escaped", "", "."] {
            let result = ph.out_file(name);
            assert!(matches!(result, Err(Error::Template(_))), "{name}: {result:?}");
        }
    }

    #[test]
    fn test_temp_dirs_are_unique_per_helper() {
        let dir = tempfile::tempdir().unwrap();
        let a = make_helper(dir.path());
        let b = make_helper(dir.path());
        assert_ne!(a.temp_dir(), b.temp_dir());
    }

    #[test]
    fn test_delete_temp_dir_removes_contents() {
        let dir = tempfile::tempdir().unwrap();
        let mut ph = make_helper(dir.path());
        std::fs::write(ph.out_file("x.fasta").unwrap(), b">x\nACGT\n").unwrap();

        ph.delete_temp_dir().unwrap();
        assert!(!ph.temp_dir().exists());
    }

    #[test]
    fn test_delete_temp_dir_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut ph = make_helper(dir.path());
        ph.delete_temp_dir().unwrap();
        ph.delete_temp_dir().unwrap();
        ph.delete_temp_dir().unwrap();
        assert!(!ph.temp_dir().exists());
    }

    #[test]
    fn test_delete_temp_dir_already_removed() {
        let dir = tempfile::tempdir().unwrap();
        let mut ph = make_helper(dir.path());
        std::fs::remove_dir_all(ph.temp_dir()).unwrap();
        assert!(ph.delete_temp_dir().is_ok());
    }

    #[test]
    fn test_drop_removes_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let temp_path = {
            let ph = make_helper(dir.path());
            ph.temp_dir().to_path_buf()
        };
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_new_in_missing_parent_is_temp_dir_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let result = PathHelper::new_in("/src", "/build", "tests", &missing);
        assert!(matches!(result, Err(Error::TempDir(_))));
    }
}
