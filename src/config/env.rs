//! Environment variable processing for runtime configuration overrides.
//!
//! Env var prefix: `GOLDEN_HARNESS_`
//!
//! - `GOLDEN_HARNESS_PROFILE`: select a profile defined in the suite manifest
//! - `GOLDEN_HARNESS_TIMEOUT`: per-case timeout in seconds
//! - `GOLDEN_HARNESS_JOBS`: number of concurrent cases
//! - `GOLDEN_HARNESS_WORKING_DIR`: `temp` or `tests`
//! - `GOLDEN_HARNESS_STDERR`: `inherit` or `null`
//! - `GOLDEN_HARNESS_VERBOSE`: enable verbose output (1/true/yes)
//! - `GOLDEN_HARNESS_ARCH`: architecture identifier fed to the platform gate

use super::{RunConfig, StderrPolicy, WorkingDir};

const PREFIX: &str = "GOLDEN_HARNESS_";

/// Read the active profile name from `GOLDEN_HARNESS_PROFILE`.
pub fn get_profile_name() -> Option<String> {
    env_str("PROFILE")
}

/// Architecture identifier override from `GOLDEN_HARNESS_ARCH`.
pub fn get_arch_override() -> Option<String> {
    env_str("ARCH")
}

/// Apply individual env var overrides to the run settings.
///
/// Each override is applied only if the env var is set and parses correctly.
/// Invalid values are silently ignored.
pub fn apply_env_overrides(run: &mut RunConfig) {
    if let Some(val) = env_parse::<u64>("TIMEOUT").filter(|&t| t > 0) {
        run.timeout = Some(val);
    }

    if let Some(val) = env_parse::<usize>("JOBS").filter(|&j| j > 0) {
        run.jobs = val;
    }

    if let Some(val) = env_str("WORKING_DIR")
        .and_then(|s| serde_plain::from_str::<WorkingDir>(&s.to_lowercase()).ok())
    {
        run.working_dir = val;
    }

    if let Some(val) = env_str("STDERR")
        .and_then(|s| serde_plain::from_str::<StderrPolicy>(&s.to_lowercase()).ok())
    {
        run.stderr = val;
    }

    if let Some(val) = env_bool("VERBOSE") {
        run.verbose = val;
    }
}

/// Summarize which env var overrides are currently active.
pub fn detect_active_overrides() -> Vec<(String, String)> {
    let keys = [
        "PROFILE",
        "TIMEOUT",
        "JOBS",
        "WORKING_DIR",
        "STDERR",
        "VERBOSE",
        "ARCH",
    ];

    let mut active = Vec::new();
    for key in keys {
        let full = format!("{PREFIX}{key}");
        if let Ok(val) = std::env::var(&full) {
            if !val.is_empty() {
                active.push((full, val));
            }
        }
    }
    active
}

// --- helpers ---

fn env_str(suffix: &str) -> Option<String> {
    std::env::var(format!("{PREFIX}{suffix}"))
        .ok()
        .filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(suffix: &str) -> Option<T> {
    env_str(suffix).and_then(|s| s.parse().ok())
}

fn env_bool(suffix: &str) -> Option<bool> {
    env_str(suffix).map(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env vars are process-global, so serialize tests that mutate them.
    pub(crate) static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Helper: run a closure with specific env vars set, then restore.
    pub(crate) fn with_env_vars<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut old: Vec<(&str, Option<String>)> = Vec::new();
        for &(k, v) in vars {
            old.push((k, std::env::var(k).ok()));
            // SAFETY: tests are serialized via ENV_LOCK
            unsafe { std::env::set_var(k, v) };
        }
        f();
        for (k, prev) in old {
            // SAFETY: tests are serialized via ENV_LOCK
            match prev {
                Some(v) => unsafe { std::env::set_var(k, v) },
                None => unsafe { std::env::remove_var(k) },
            }
        }
    }

    /// Helper: run with specific env vars removed.
    pub(crate) fn without_env_vars<F: FnOnce()>(vars: &[&str], f: F) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut old: Vec<(&str, Option<String>)> = Vec::new();
        for &k in vars {
            old.push((k, std::env::var(k).ok()));
            // SAFETY: tests are serialized via ENV_LOCK
            unsafe { std::env::remove_var(k) };
        }
        f();
        for (k, prev) in old {
            // SAFETY: tests are serialized via ENV_LOCK
            match prev {
                Some(v) => unsafe { std::env::set_var(k, v) },
                None => unsafe { std::env::remove_var(k) },
            }
        }
    }

    #[test]
    fn test_get_profile_name_set() {
        with_env_vars(&[("GOLDEN_HARNESS_PROFILE", "ci")], || {
            assert_eq!(get_profile_name(), Some("ci".to_string()));
        });
    }

    #[test]
    fn test_get_profile_name_empty() {
        with_env_vars(&[("GOLDEN_HARNESS_PROFILE", "")], || {
            assert_eq!(get_profile_name(), None);
        });
    }

    #[test]
    fn test_get_arch_override() {
        with_env_vars(&[("GOLDEN_HARNESS_ARCH", "s390x")], || {
            assert_eq!(get_arch_override(), Some("s390x".to_string()));
        });
        without_env_vars(&["GOLDEN_HARNESS_ARCH"], || {
            assert_eq!(get_arch_override(), None);
        });
    }

    #[test]
    fn test_apply_env_overrides_all_fields() {
        with_env_vars(
            &[
                ("GOLDEN_HARNESS_TIMEOUT", "120"),
                ("GOLDEN_HARNESS_JOBS", "8"),
                ("GOLDEN_HARNESS_WORKING_DIR", "Tests"),
                ("GOLDEN_HARNESS_STDERR", "null"),
                ("GOLDEN_HARNESS_VERBOSE", "yes"),
            ],
            || {
                let mut run = RunConfig::default();
                apply_env_overrides(&mut run);
                assert_eq!(run.timeout, Some(120));
                assert_eq!(run.jobs, 8);
                assert_eq!(run.working_dir, WorkingDir::Tests);
                assert_eq!(run.stderr, StderrPolicy::Null);
                assert!(run.verbose);
            },
        );
    }

    #[test]
    fn test_apply_env_overrides_invalid_values_ignored() {
        with_env_vars(
            &[
                ("GOLDEN_HARNESS_TIMEOUT", "soon"),
                ("GOLDEN_HARNESS_JOBS", "0"),
                ("GOLDEN_HARNESS_WORKING_DIR", "elsewhere"),
            ],
            || {
                let mut run = RunConfig::default();
                apply_env_overrides(&mut run);
                assert_eq!(run, RunConfig::default());
            },
        );
    }

    #[test]
    fn test_apply_env_overrides_unset() {
        without_env_vars(
            &[
                "GOLDEN_HARNESS_TIMEOUT",
                "GOLDEN_HARNESS_JOBS",
                "GOLDEN_HARNESS_WORKING_DIR",
                "GOLDEN_HARNESS_STDERR",
                "GOLDEN_HARNESS_VERBOSE",
            ],
            || {
                let mut run = RunConfig::default();
                apply_env_overrides(&mut run);
                assert_eq!(run, RunConfig::default());
            },
        );
    }

    #[test]
    fn test_detect_active_overrides() {
        with_env_vars(&[("GOLDEN_HARNESS_JOBS", "2")], || {
            let active = detect_active_overrides();
            assert!(active.contains(&("GOLDEN_HARNESS_JOBS".to_string(), "2".to_string())));
        });
    }
}
