//! Authentication errors.

use thiserror::Error;

use crate::domain::ExternalId;
use crate::infrastructure::RepositoryError;
use crate::service::ErrorKind;

/// Reasons a request could not be bound to a principal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// `Authorization` header present but not `Bearer <token>`.
    #[error("Invalid Authorization header format")]
    InvalidCredentialFormat,

    /// Neither a bearer token nor a session cookie was supplied.
    #[error("No credential supplied")]
    MissingCredential,

    /// The identity provider rejected the credential.
    #[error("Credential rejected by identity provider")]
    Unauthenticated,

    /// The credential is valid but no user is registered for it.
    #[error("No user registered for identity {0}")]
    UnregisteredIdentity(ExternalId),

    /// User lookup or provisioning failed.
    #[error("User lookup failed: {0}")]
    Repository(#[from] RepositoryError),
}

impl AuthError {
    /// Transport-independent classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCredentialFormat
            | Self::MissingCredential
            | Self::Unauthenticated
            | Self::UnregisteredIdentity(_) => ErrorKind::Unauthenticated,
            Self::Repository(RepositoryError::Cancelled) => ErrorKind::Cancelled,
            Self::Repository(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to show to clients.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "An internal error occurred".to_string(),
            ErrorKind::Cancelled => "Request cancelled".to_string(),
            _ if matches!(self, Self::UnregisteredIdentity(_)) => "Unauthorized".to_string(),
            _ => self.to_string(),
        }
    }
}
