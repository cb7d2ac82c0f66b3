//! Authentication.
//!
//! A request authenticates with either a bearer token (validated by token
//! introspection) or a session cookie (validated by the session service),
//! never both. [`PrincipalResolver`] is the single decision point that turns
//! either into a [`crate::domain::Principal`].

pub mod credential;
pub mod error;
pub mod resolver;
pub mod verifier;

pub use credential::Credential;
pub use error::AuthError;
pub use resolver::{PrincipalResolver, ProvisioningPolicy};
pub use verifier::{
    CredentialVerifier, OryCredentialVerifier, StaticCredentialVerifier, VerifiedToken,
    split_scopes,
};
