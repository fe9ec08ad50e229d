//! Resolves the effective backup target set for an instance.
//!
//! The rule is deliberate and fixed: a non-empty whitelist wins outright
//! and the blacklist is ignored entirely; only an empty whitelist lets
//! the blacklist and the engine's system exclusions apply. Output
//! preserves the order of `all_targets`, with duplicates collapsed.

use std::collections::HashSet;

pub fn effective_targets(
    all_targets: &[String],
    whitelist: &[String],
    blacklist: &[String],
    system_excludes: &[&str],
) -> Vec<String> {
    let mut seen = HashSet::new();

    if !whitelist.is_empty() {
        let wanted: HashSet<&str> = whitelist.iter().map(String::as_str).collect();
        return all_targets
            .iter()
            .filter(|t| wanted.contains(t.as_str()))
            .filter(|t| seen.insert(t.as_str().to_string()))
            .cloned()
            .collect();
    }

    let banned: HashSet<&str> = blacklist
        .iter()
        .map(String::as_str)
        .chain(system_excludes.iter().copied())
        .collect();

    all_targets
        .iter()
        .filter(|t| !banned.contains(t.as_str()))
        .filter(|t| seen.insert(t.as_str().to_string()))
        .cloned()
        .collect()
}
