use super::SuiteConfig;
use crate::core::error::{Error, Result};
use std::path::PathBuf;

/// Resolves a suite manifest and layers overrides on top of it.
pub struct ConfigLoader {
    /// Built-in suite name or path to a manifest file.
    suite: String,
    /// Explicit profile; falls back to `GOLDEN_HARNESS_PROFILE`.
    profile: Option<String>,
    /// Whether to apply `GOLDEN_HARNESS_*` overrides.
    use_env: bool,
}

impl ConfigLoader {
    /// Create a loader for a built-in suite name or manifest path.
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            profile: None,
            use_env: true,
        }
    }

    /// Select a profile explicitly.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Ignore `GOLDEN_HARNESS_*` environment variables.
    pub fn no_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Load the suite.
    ///
    /// Priority (later sources override earlier):
    /// 1. Manifest (built-in or file)
    /// 2. Profile overlay
    /// 3. Individual env var overrides (`GOLDEN_HARNESS_*`)
    pub fn load(self) -> Result<SuiteConfig> {
        let content = self.read_manifest()?;
        let mut config: SuiteConfig = toml::from_str(&content)?;

        let profile = self.profile.clone().or_else(|| {
            if self.use_env {
                super::env::get_profile_name()
            } else {
                None
            }
        });
        if let Some(profile_name) = profile {
            config = apply_profile(config, &profile_name)?;
        }

        if self.use_env {
            super::env::apply_env_overrides(&mut config.run);
        }

        config.validate()?;
        Ok(config)
    }

    fn read_manifest(&self) -> Result<String> {
        if let Some(content) = crate::suites::builtin(&self.suite) {
            return Ok(content.to_string());
        }

        let path = PathBuf::from(&self.suite);
        if path.is_file() {
            return std::fs::read_to_string(&path).map_err(|e| {
                Error::config(format!("failed to read suite file {}: {}", path.display(), e))
            });
        }

        Err(Error::UnknownSuite(self.suite.clone()))
    }
}

/// Overlay the named profile onto `config`.
fn apply_profile(config: SuiteConfig, profile_name: &str) -> Result<SuiteConfig> {
    let profile_value = config.profiles.get(profile_name).ok_or_else(|| {
        let mut available: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
        available.sort_unstable();
        if available.is_empty() {
            Error::config(format!(
                "profile '{}' not found (no profiles defined)",
                profile_name
            ))
        } else {
            Error::config(format!(
                "profile '{}' not found. Available profiles: {}",
                profile_name,
                available.join(", ")
            ))
        }
    })?;

    let overlay = serde_json::to_value(profile_value)?;
    let mut base_value = serde_json::to_value(&config)
        .map_err(|e| Error::config(format!("failed to serialize config: {}", e)))?;
    deep_merge(&mut base_value, &overlay);
    serde_json::from_value(base_value)
        .map_err(|e| Error::config(format!("failed to apply profile '{}': {}", profile_name, e)))
}

/// Recursively deep-merge `overlay` into `base`.
///
/// - Objects: keys are merged recursively (overlay keys win for conflicts).
/// - Scalars and arrays: overlay replaces base entirely.
pub(crate) fn deep_merge(base: &mut serde_json::Value, overlay: &serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let entry = base_map
                    .entry(key.clone())
                    .or_insert(serde_json::Value::Null);
                deep_merge(entry, overlay_val);
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}
