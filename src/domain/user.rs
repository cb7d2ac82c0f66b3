//! User domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Value Objects - Newtypes
// =============================================================================

/// Internal identifier of a user.
///
/// Generated once when the user is materialized and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a `UserId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Generates a new random (v4) `UserId`.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Subject identifier issued by the identity provider.
///
/// Never blank. Use [`ExternalId::parse`] to build one from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalId(String);

impl ExternalId {
    /// Parses an external identifier, rejecting blank values.
    ///
    /// Surrounding whitespace is removed.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExternalId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(&self.0)
    }
}

// =============================================================================
// User Entity
// =============================================================================

/// A registered user.
///
/// Exactly one user exists per distinct [`ExternalId`]. Users are created by
/// materialization and never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Internal identifier, the owner key of every task.
    pub id: UserId,
    /// Identity-provider subject this user is bound to.
    pub external_id: ExternalId,
}

impl User {
    /// Creates a user from its parts.
    #[must_use]
    pub const fn new(id: UserId, external_id: ExternalId) -> Self {
        Self { id, external_id }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("kratos-subject", "kratos-subject")]
    #[case("  padded  ", "padded")]
    fn test_external_id_parse_accepts_non_blank(#[case] input: &str, #[case] expected: &str) {
        let external_id = ExternalId::parse(input).unwrap();
        assert_eq!(external_id.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t\n")]
    fn test_external_id_parse_rejects_blank(#[case] input: &str) {
        assert!(ExternalId::parse(input).is_none());
    }

    #[rstest]
    fn test_user_id_generate_is_unique() {
        assert_ne!(UserId::generate(), UserId::generate());
    }

    #[rstest]
    fn test_user_id_display_matches_uuid() {
        let uuid = Uuid::new_v4();
        assert_eq!(UserId::from_uuid(uuid).to_string(), uuid.to_string());
    }
}
