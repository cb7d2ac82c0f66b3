//! The authenticated actor of a request.

use super::UserId;

/// The user a request acts on behalf of.
///
/// Only the principal resolver constructs principals, so every task
/// operation is guaranteed to receive an owner that passed credential
/// verification. Scopes are present for bearer-token requests and absent for
/// session-cookie requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    user_id: UserId,
    scopes: Option<Vec<String>>,
}

impl Principal {
    pub(crate) const fn new(user_id: UserId, scopes: Option<Vec<String>>) -> Self {
        Self { user_id, scopes }
    }

    /// Internal id of the authenticated user.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Scopes granted to the bearer token, if the request used one.
    #[must_use]
    pub fn scopes(&self) -> Option<&[String]> {
        self.scopes.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_cookie_principal_has_no_scopes() {
        let principal = Principal::new(UserId::generate(), None);
        assert!(principal.scopes().is_none());
    }

    #[rstest]
    fn test_token_principal_reports_scopes() {
        let principal = Principal::new(
            UserId::generate(),
            Some(vec!["openid".to_string(), "tasks:read".to_string()]),
        );
        assert_eq!(
            principal.scopes(),
            Some(&["openid".to_string(), "tasks:read".to_string()][..])
        );
    }
}
