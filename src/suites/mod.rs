//! Suite manifests compiled into the binary.

const SEQAN_TCOFFEE: &str = include_str!("seqan_tcoffee.toml");

const BUILTIN: &[(&str, &str)] = &[("seqan_tcoffee", SEQAN_TCOFFEE)];

/// Manifest text of a built-in suite.
pub fn builtin(name: &str) -> Option<&'static str> {
    BUILTIN
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, content)| *content)
}

/// Names of all built-in suites.
pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|(name, _)| *name)
}
