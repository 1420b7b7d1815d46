//! Architecture gate evaluated before anything else touches the filesystem.

/// Identifier of the architecture this binary was compiled for.
pub fn current_arch() -> &'static str {
    std::env::consts::ARCH
}

/// Whether a suite with `denylist` must be skipped on `arch`.
///
/// Entries match as case-insensitive prefixes, so `mips` covers `mips64` and
/// `s390` covers `s390x`.
pub fn should_skip(arch: &str, denylist: &[String]) -> bool {
    let arch = arch.to_ascii_lowercase();
    denylist
        .iter()
        .map(|entry| entry.trim().to_ascii_lowercase())
        .any(|entry| !entry.is_empty() && arch.starts_with(&entry))
}
