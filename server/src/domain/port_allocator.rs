//! Port allocation policy.
//!
//! Ports grow monotonically: the next port is one past the highest port
//! currently assigned, or the base port when nothing is assigned. Freed ports
//! are never reused. The policy is pure; the store applies it while holding
//! its write lock so concurrent allocations serialize.

use crate::domain::error::PortError;

/// Monotonic port allocation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortAllocator {
    base: u16,
}

impl PortAllocator {
    #[must_use]
    pub fn new(base: u16) -> Self {
        Self { base }
    }

    #[must_use]
    pub fn base(&self) -> u16 {
        self.base
    }

    /// Port for a new record given the highest port currently assigned.
    ///
    /// A maximum below the base (records created under an older base) still
    /// yields the base.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Exhausted`] when the maximum is already 65535.
    pub fn next_port(&self, current_max: Option<u16>) -> Result<u16, PortError> {
        match current_max {
            None => Ok(self.base),
            Some(max) if max < self.base => Ok(self.base),
            Some(max) => max.checked_add(1).ok_or(PortError::Exhausted(max)),
        }
    }
}
