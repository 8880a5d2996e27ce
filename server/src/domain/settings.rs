//! Validation for the owner-editable server settings (version and mods).

use mchost_common::SettingsUpdate;

const MAX_VERSION_LEN: usize = 20;

/// Validate a settings update and return it with `mods` normalized.
///
/// # Errors
///
/// Returns a human-readable reason when the version or mod list is malformed.
pub fn validate_settings(update: &SettingsUpdate) -> Result<SettingsUpdate, String> {
    let version = update.version.trim();
    if version.is_empty() {
        return Err("version must not be empty".to_string());
    }
    if version.len() > MAX_VERSION_LEN {
        return Err(format!("version must be at most {MAX_VERSION_LEN} characters"));
    }
    if !version
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err(format!("version '{version}' contains invalid characters"));
    }
    Ok(SettingsUpdate {
        version: version.to_string(),
        mods: normalize_mods(&update.mods)?,
    })
}

/// Normalize a comma-separated CurseForge mod list.
///
/// Entries may be project ids, slugs or `slug:fileId` pins. Whitespace
/// around entries is trimmed and empty entries dropped.
///
/// # Errors
///
/// Returns a reason naming the first entry with whitespace or control
/// characters inside it.
pub fn normalize_mods(mods: &str) -> Result<String, String> {
    let mut entries = Vec::new();
    for entry in mods.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        if entry.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(format!(
                "mod entry '{}' contains whitespace or control characters",
                entry.escape_debug()
            ));
        }
        entries.push(entry);
    }
    Ok(entries.join(","))
}
