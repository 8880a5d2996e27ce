//! Plan-size parsing for purchase metadata.
//!
//! Checkout attaches human-readable option labels (`"4 vCPU"`, `"8 GB"`,
//! `"高クロック 2 vCPU"`) to the payment. The numeric part is the first run of
//! ASCII digits anywhere in the label.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// CPU label assumed when the purchase carries none.
pub const DEFAULT_CPU: &str = "2 vCPU";

/// RAM label assumed when the purchase carries none.
pub const DEFAULT_RAM: &str = "2 GB";

static DIGITS: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // literal pattern
    Regex::new(r"[0-9]+").unwrap()
});

/// Errors raised while turning plan labels into resource limits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("{field} '{value}' does not contain a number")]
    NoDigits { field: &'static str, value: String },

    #[error("{field} '{value}' must be greater than zero")]
    Zero { field: &'static str, value: String },

    #[error("{field} '{value}' is too large")]
    Overflow { field: &'static str, value: String },
}

/// Resource attributes derived from purchase metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSpec {
    pub cpu_cores: u32,
    /// Memory ceiling in container notation (`"8g"`).
    pub mem_limit: String,
    pub storage: String,
    pub backup_type: String,
}

impl PlanSpec {
    /// Build a plan from the raw option labels, applying the defaults for
    /// missing CPU and RAM.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] if the CPU or RAM label has no digits, is zero,
    /// or does not fit in a `u32`.
    pub fn from_labels(
        cpu: Option<&str>,
        ram: Option<&str>,
        storage: Option<&str>,
        backup: Option<&str>,
    ) -> Result<Self, PlanError> {
        let cpu_cores = positive("cpu", cpu.unwrap_or(DEFAULT_CPU))?;
        let mem_gb = positive("ram", ram.unwrap_or(DEFAULT_RAM))?;
        Ok(Self {
            cpu_cores,
            mem_limit: format!("{mem_gb}g"),
            storage: storage.unwrap_or_default().to_string(),
            backup_type: backup.unwrap_or_default().to_string(),
        })
    }
}

/// Extract the first run of digits from `label`.
///
/// # Errors
///
/// Returns [`PlanError::NoDigits`] when the label has no digits and
/// [`PlanError::Overflow`] when the run does not fit in a `u32`.
pub fn leading_integer(field: &'static str, label: &str) -> Result<u32, PlanError> {
    let Some(digits) = DIGITS.find(label) else {
        return Err(PlanError::NoDigits {
            field,
            value: label.to_string(),
        });
    };
    digits.as_str().parse().map_err(|_| PlanError::Overflow {
        field,
        value: label.to_string(),
    })
}

fn positive(field: &'static str, label: &str) -> Result<u32, PlanError> {
    let value = leading_integer(field, label)?;
    if value == 0 {
        return Err(PlanError::Zero {
            field,
            value: label.to_string(),
        });
    }
    Ok(value)
}
