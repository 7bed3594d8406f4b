//! Invalidation epoch.

use serde::{Deserialize, Serialize};

/// Process-wide invalidation epoch.
///
/// Strictly increases on every successful avatar mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionToken(u64);

impl VersionToken {
    /// Value of a process that has never invalidated anything.
    pub const INITIAL: Self = Self(0);

    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the token following `self`, never earlier than `now_millis`.
    #[must_use]
    pub fn advance(self, now_millis: u64) -> Self {
        Self(now_millis.max(self.0.saturating_add(1)))
    }
}

impl Default for VersionToken {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl std::fmt::Display for VersionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
