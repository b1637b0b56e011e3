//! Player identifiers.
//!
//! Players are named by whatever string the browser client typed in. The
//! only constraint enforced here is that the name is not blank.

use serde::{Deserialize, Serialize};

use crate::TypeError;

/// Identifier of a player, as supplied by the client.
///
/// Ordering is plain byte-wise string ordering, which the leaderboard uses
/// to break ties between equal scores.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerId(String);

impl PlayerId {
    /// Create a player identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::EmptyPlayerId`] if `name` is empty or only
    /// whitespace.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TypeError::EmptyPlayerId);
        }
        Ok(Self(name))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PlayerId {
    type Error = TypeError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

impl From<PlayerId> for String {
    fn from(id: PlayerId) -> Self {
        id.0
    }
}

impl core::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_rejected() {
        assert_eq!(PlayerId::new(""), Err(TypeError::EmptyPlayerId));
        assert_eq!(PlayerId::new("   "), Err(TypeError::EmptyPlayerId));
    }

    #[test]
    fn name_is_kept_verbatim() {
        let id = PlayerId::new(" alice ").unwrap();
        assert_eq!(id.as_str(), " alice ");
        assert_eq!(id.to_string(), " alice ");
    }

    #[test]
    fn deserialize_rejects_empty_string() {
        let result: Result<PlayerId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());

        let id: PlayerId = serde_json::from_str("\"bob\"").unwrap();
        assert_eq!(id.as_str(), "bob");
    }
}
