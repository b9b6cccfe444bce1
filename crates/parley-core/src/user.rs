//! User identity types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pseudo-member of the default room, used as a broadcast-recipient
/// sentinel: a message addressed to `everyone` is delivered to every
/// member of the room.
pub const EVERYONE: &str = "everyone";

/// Display name identifying a user for the lifetime of their connection.
///
/// Names are client-chosen and unique process-wide. The broker rejects a
/// second registration of the same name rather than renaming anyone, and
/// it never validates that a name refers to a live connection: the caller
/// supplies their own name (and current room) on every operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserName(String);

impl UserName {
    /// Creates a new UserName from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the `everyone` broadcast sentinel.
    pub fn everyone() -> Self {
        Self(EVERYONE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks whether this is the `everyone` broadcast sentinel.
    #[must_use]
    pub fn is_everyone(&self) -> bool {
        self.0 == EVERYONE
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_everyone_sentinel() {
        assert!(UserName::everyone().is_everyone());
        assert!(!UserName::new("alice").is_everyone());
    }

    #[test]
    fn test_empty_name() {
        assert!(UserName::new("").is_empty());
        assert!(!UserName::new("bob").is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(UserName::new("carol").to_string(), "carol");
    }
}
