//! Execution identifier type.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for execution ID generation.
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies one execution (and therefore one channel) in logs.
///
/// Displayed as `exec-XXXXXXXX` where X is a hexadecimal digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecId(u64);

impl ExecId {
    /// Create a new unique execution ID.
    pub fn new() -> Self {
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw u64 value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Create an ExecId from a raw value.
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }
}

impl Default for ExecId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exec-{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uniqueness() {
        let ids: HashSet<_> = (0..1_000).map(|_| ExecId::new()).collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn test_display_format() {
        assert_eq!(ExecId::from_raw(255).to_string(), "exec-000000ff");
        assert_eq!(ExecId::from_raw(0x12345678).as_u64(), 0x12345678);
    }
}
