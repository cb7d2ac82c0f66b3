//! Principal resolution.
//!
//! Turns the credential a request carries into the [`Principal`] every task
//! operation is scoped to. This is the only place principals are created.

use std::str::FromStr;
use std::sync::Arc;

use axum::http::HeaderMap;
use serde::Deserialize;

use super::{AuthError, Credential, CredentialVerifier};
use crate::config::ConfigurationError;
use crate::context::RequestContext;
use crate::domain::{ExternalId, Principal, User};
use crate::infrastructure::UserRepository;

/// What to do when a verified identity has no registered user.
///
/// Applied identically to the cookie and bearer-token paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningPolicy {
    /// Users are created only by the registration webhook; an unknown
    /// identity is rejected.
    #[default]
    RequireRegistration,
    /// An unknown identity is materialized on its first request.
    ProvisionOnFirstContact,
}

impl FromStr for ProvisioningPolicy {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "require_registration" => Ok(Self::RequireRegistration),
            "provision_on_first_contact" => Ok(Self::ProvisionOnFirstContact),
            _ => Err(ConfigurationError::InvalidValue {
                key: "PROVISIONING_POLICY",
                value: value.to_string(),
                reason: "expected 'require_registration' or 'provision_on_first_contact'"
                    .to_string(),
            }),
        }
    }
}

/// Resolves request credentials to principals.
#[derive(Clone)]
pub struct PrincipalResolver {
    verifier: Arc<dyn CredentialVerifier>,
    users: Arc<dyn UserRepository>,
    cookie_name: String,
    policy: ProvisioningPolicy,
}

impl PrincipalResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(
        verifier: Arc<dyn CredentialVerifier>,
        users: Arc<dyn UserRepository>,
        cookie_name: impl Into<String>,
        policy: ProvisioningPolicy,
    ) -> Self {
        Self {
            verifier,
            users,
            cookie_name: cookie_name.into(),
            policy,
        }
    }

    /// Classifies and resolves the credential in `headers`.
    ///
    /// # Errors
    ///
    /// See [`Self::resolve`]; additionally `InvalidCredentialFormat` for a
    /// malformed `Authorization` header.
    pub async fn resolve_headers(
        &self,
        context: &RequestContext,
        headers: &HeaderMap,
    ) -> Result<Principal, AuthError> {
        let credential = Credential::from_headers(headers, &self.cookie_name)?;
        self.resolve(context, credential).await
    }

    /// Resolves a classified credential.
    ///
    /// `Missing` fails immediately without contacting the identity provider
    /// or the user repository.
    ///
    /// # Errors
    ///
    /// - `MissingCredential` when nothing was supplied
    /// - `Unauthenticated` when the identity provider rejects the credential
    /// - `UnregisteredIdentity` when no user exists and the policy forbids
    ///   provisioning
    /// - `Repository` when the user lookup fails
    pub async fn resolve(
        &self,
        context: &RequestContext,
        credential: Credential,
    ) -> Result<Principal, AuthError> {
        match credential {
            Credential::Missing => Err(AuthError::MissingCredential),
            Credential::Cookie(cookie) => {
                let subject = self
                    .verifier
                    .verify_cookie(&cookie)
                    .await
                    .ok_or(AuthError::Unauthenticated)?;
                let user = self.user_for(context, &subject).await?;
                tracing::debug!(user_id = %user.id, "Principal resolved from session cookie");
                Ok(Principal::new(user.id, None))
            }
            Credential::Bearer(token) => {
                let verified = self
                    .verifier
                    .verify_bearer_token(&token)
                    .await
                    .ok_or(AuthError::Unauthenticated)?;
                let user = self.user_for(context, &verified.subject).await?;
                let principal = Principal::new(user.id, Some(verified.scopes));
                tracing::debug!(
                    user_id = %principal.user_id(),
                    scopes = ?principal.scopes(),
                    "Principal resolved from bearer token"
                );
                Ok(principal)
            }
        }
    }

    async fn user_for(
        &self,
        context: &RequestContext,
        subject: &ExternalId,
    ) -> Result<User, AuthError> {
        if let Some(user) = self.users.find_by_external_id(context, subject).await? {
            return Ok(user);
        }

        match self.policy {
            ProvisioningPolicy::RequireRegistration => {
                tracing::error!(
                    external_id = %subject,
                    "Verified identity has no registered user"
                );
                Err(AuthError::UnregisteredIdentity(subject.clone()))
            }
            ProvisioningPolicy::ProvisionOnFirstContact => {
                let user = self.users.materialize(context, subject).await?;
                tracing::info!(user_id = %user.id, "Provisioned user on first contact");
                Ok(user)
            }
        }
    }
}

impl std::fmt::Debug for PrincipalResolver {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("PrincipalResolver")
            .field("cookie_name", &self.cookie_name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
