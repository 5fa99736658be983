//! Per-application bypass policy.

use std::collections::BTreeSet;

/// Trim surrounding whitespace and lowercase.
pub fn normalize_bundle_id(bundle_id: &str) -> String {
    bundle_id.trim().to_lowercase()
}

/// Parse a user-edited list of bundle identifiers.
///
/// Entries are separated by newlines or commas. Blank entries and entries
/// starting with `#` are dropped; the rest are normalized, so duplicates
/// that differ only in case or padding collapse.
pub fn parse_bundle_id_list(text: &str) -> BTreeSet<String> {
    text.split(['\n', ','])
        .map(str::trim)
        .filter(|entry| !entry.is_empty() && !entry.starts_with('#'))
        .map(normalize_bundle_id)
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Render a set back into the newline-separated list form.
pub fn format_bundle_id_list(ids: &BTreeSet<String>) -> String {
    ids.iter().cloned().collect::<Vec<_>>().join("\n")
}

/// Decide whether transformation must be skipped for the active app.
///
/// An unknown active app fails open to normal operation. The agent's own
/// app is always bypassed while exclusion is on.
pub fn should_bypass(
    global_enabled: bool,
    app_exclusion_enabled: bool,
    excluded: &BTreeSet<String>,
    active_app_id: Option<&str>,
    self_app_id: Option<&str>,
) -> bool {
    if !global_enabled {
        return true;
    }
    if !app_exclusion_enabled {
        return false;
    }
    let Some(active) = active_app_id else {
        return false;
    };

    let active = normalize_bundle_id(active);
    if self_app_id.is_some_and(|own| normalize_bundle_id(own) == active) {
        return true;
    }
    excluded.contains(&active)
}
