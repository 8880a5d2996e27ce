//! JSON output helpers for `--json` mode.

use anyhow::{Context, Result};
use serde::Serialize;

/// Pretty-print any serializable value to stdout.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("JSON serialization failed")?);
    Ok(())
}

/// Format a JSON error object:
///
/// ```json
/// { "error": true, "message": "...", "code": "..." }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}
