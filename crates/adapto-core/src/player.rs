//! Player identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Maximum accepted length of a player identifier.
pub const MAX_PLAYER_ID_LEN: usize = 64;

/// Identifier keying a player's durable progress record.
///
/// Restricted to ASCII alphanumerics, `-` and `_` so it can be used verbatim
/// as a storage key and in URL paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerId(String);

impl PlayerId {
    /// Parses a player identifier.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the value is empty, too long, or
    /// contains characters outside `[A-Za-z0-9_-]`.
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DomainError::Validation(
                "player id must not be empty".to_owned(),
            ));
        }
        if value.len() > MAX_PLAYER_ID_LEN {
            return Err(DomainError::Validation(format!(
                "player id must be at most {MAX_PLAYER_ID_LEN} characters"
            )));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::Validation(format!(
                "player id {value:?} contains invalid characters"
            )));
        }
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PlayerId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<PlayerId> for String {
    fn from(id: PlayerId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_alphanumeric_dash_and_underscore() {
        let id = PlayerId::parse("player-7743_b").unwrap();
        assert_eq!(id.as_str(), "player-7743_b");
    }

    #[test]
    fn test_parse_rejects_empty() {
        match PlayerId::parse("") {
            Err(DomainError::Validation(msg)) => assert_eq!(msg, "player id must not be empty"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_path_separators() {
        assert!(PlayerId::parse("../etc").is_err());
    }

    #[test]
    fn test_parse_rejects_overlong_ids() {
        let long = "a".repeat(MAX_PLAYER_ID_LEN + 1);
        assert!(PlayerId::parse(long).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: PlayerId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(ok.as_str(), "abc");
        assert!(serde_json::from_str::<PlayerId>("\"a b\"").is_err());
    }
}
