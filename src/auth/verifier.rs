//! Credential verification against the identity provider.
//!
//! Verification never fails with an error: any transport failure, rejected
//! status, undecodable body, inactive session or token, or missing subject
//! yields `None` and is logged.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::header::COOKIE;
use serde::Deserialize;

use crate::domain::ExternalId;

/// Identity and scopes obtained from token introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: ExternalId,
    pub scopes: Vec<String>,
}

/// Validates credentials with the identity provider.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Resolves a session cookie (`name=value`) to the identity it belongs to.
    async fn verify_cookie(&self, cookie: &str) -> Option<ExternalId>;

    /// Introspects a bearer token.
    async fn verify_bearer_token(&self, token: &str) -> Option<VerifiedToken>;
}

/// Splits a whitespace-separated OAuth scope string, dropping empty entries.
#[must_use]
pub fn split_scopes(scope: &str) -> Vec<String> {
    scope.split_whitespace().map(str::to_string).collect()
}

// =============================================================================
// Ory Verifier
// =============================================================================

#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(default)]
    active: bool,
    identity: Option<SessionIdentity>,
}

#[derive(Debug, Deserialize)]
struct SessionIdentity {
    id: String,
}

#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    #[serde(default)]
    active: bool,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    ext: Option<IntrospectionExtra>,
}

#[derive(Debug, Deserialize)]
struct IntrospectionExtra {
    #[serde(default)]
    sub: Option<String>,
}

/// Verifier backed by Ory Kratos (sessions) and Ory Hydra (tokens).
#[derive(Debug, Clone)]
pub struct OryCredentialVerifier {
    client: reqwest::Client,
    session_url: String,
    introspection_url: String,
}

impl OryCredentialVerifier {
    /// Creates a verifier for the given Kratos public and Hydra admin URLs.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be built.
    pub fn new(
        kratos_public_url: &str,
        hydra_admin_url: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            session_url: format!("{}/sessions/whoami", kratos_public_url.trim_end_matches('/')),
            introspection_url: format!(
                "{}/admin/oauth2/introspect",
                hydra_admin_url.trim_end_matches('/')
            ),
        })
    }
}

#[async_trait]
impl CredentialVerifier for OryCredentialVerifier {
    async fn verify_cookie(&self, cookie: &str) -> Option<ExternalId> {
        let response = match self
            .client
            .get(&self.session_url)
            .header(COOKIE, cookie)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%error, "Session verification request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(http_status = status.as_u16(), "Session verification rejected");
            return None;
        }

        let session: SessionResponse = match response.json().await {
            Ok(session) => session,
            Err(error) => {
                tracing::warn!(%error, "Session response could not be decoded");
                return None;
            }
        };

        if !session.active {
            tracing::warn!("Session is inactive");
            return None;
        }

        let subject = session
            .identity
            .and_then(|identity| ExternalId::parse(&identity.id));
        if subject.is_none() {
            tracing::warn!("Session has no identity");
        }
        subject
    }

    async fn verify_bearer_token(&self, token: &str) -> Option<VerifiedToken> {
        let response = match self
            .client
            .post(&self.introspection_url)
            .form(&[("token", token)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%error, "Token introspection request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(http_status = status.as_u16(), "Token introspection rejected");
            return None;
        }

        let introspection: IntrospectionResponse = match response.json().await {
            Ok(introspection) => introspection,
            Err(error) => {
                tracing::warn!(%error, "Introspection response could not be decoded");
                return None;
            }
        };

        if !introspection.active {
            tracing::warn!("Token is not active");
            return None;
        }

        let Some(subject) = introspection
            .ext
            .and_then(|extra| extra.sub)
            .and_then(|sub| ExternalId::parse(&sub))
        else {
            tracing::warn!("Introspection response has no ext.sub claim");
            return None;
        };

        let scopes = introspection
            .scope
            .as_deref()
            .map(split_scopes)
            .unwrap_or_default();
        if scopes.is_empty() {
            tracing::debug!(subject = %subject, "Token carries no scopes");
        }

        Some(VerifiedToken { subject, scopes })
    }
}

// =============================================================================
// Static Verifier
// =============================================================================

/// Verifier with fixed answers, for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialVerifier {
    cookies: HashMap<String, ExternalId>,
    tokens: HashMap<String, VerifiedToken>,
}

impl StaticCredentialVerifier {
    /// Creates a verifier that rejects everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `cookie` (the full `name=value` pair) as a session of `subject`.
    #[must_use]
    pub fn with_cookie(mut self, cookie: impl Into<String>, subject: ExternalId) -> Self {
        self.cookies.insert(cookie.into(), subject);
        self
    }

    /// Accepts `token` for `subject` with the given scopes.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, subject: ExternalId, scopes: &[&str]) -> Self {
        self.tokens.insert(
            token.into(),
            VerifiedToken {
                subject,
                scopes: scopes.iter().map(|scope| (*scope).to_string()).collect(),
            },
        );
        self
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentialVerifier {
    async fn verify_cookie(&self, cookie: &str) -> Option<ExternalId> {
        self.cookies.get(cookie).cloned()
    }

    async fn verify_bearer_token(&self, token: &str) -> Option<VerifiedToken> {
        self.tokens.get(token).cloned()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::Form;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, response::IntoResponse};
    use rstest::rstest;
    use serde_json::{Value, json};

    /// Serves a fake identity provider on an ephemeral port.
    async fn spawn_provider() -> String {
        async fn whoami(headers: HeaderMap) -> impl IntoResponse {
            let cookie = headers
                .get(COOKIE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default();
            match cookie {
                "ory_kratos_session=good" => (
                    StatusCode::OK,
                    Json(json!({ "active": true, "identity": { "id": "kratos-alice" } })),
                ),
                "ory_kratos_session=stale" => (
                    StatusCode::OK,
                    Json(json!({ "active": false, "identity": { "id": "kratos-alice" } })),
                ),
                _ => (StatusCode::UNAUTHORIZED, Json(json!({ "error": "no session" }))),
            }
        }

        async fn introspect(Form(form): Form<HashMap<String, String>>) -> Json<Value> {
            match form.get("token").map(String::as_str) {
                Some("good") => Json(json!({
                    "active": true,
                    "sub": "client-id",
                    "scope": "openid  tasks:read",
                    "ext": { "sub": "kratos-bob" }
                })),
                Some("no-ext") => Json(json!({ "active": true, "sub": "client-id" })),
                _ => Json(json!({ "active": false })),
            }
        }

        let router = Router::new()
            .route("/sessions/whoami", get(whoami))
            .route("/admin/oauth2/introspect", post(introspect));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{address}")
    }

    async fn verifier() -> OryCredentialVerifier {
        let base = spawn_provider().await;
        OryCredentialVerifier::new(&base, &format!("{base}/"), Duration::from_secs(2)).unwrap()
    }

    #[rstest]
    #[case("openid tasks:read", vec!["openid", "tasks:read"])]
    #[case("  openid   ", vec!["openid"])]
    #[case("", vec![])]
    fn test_split_scopes(#[case] input: &str, #[case] expected: Vec<&str>) {
        assert_eq!(split_scopes(input), expected);
    }

    #[rstest]
    #[tokio::test]
    async fn test_ory_cookie_active_session() {
        let subject = verifier().await.verify_cookie("ory_kratos_session=good").await;
        assert_eq!(subject, ExternalId::parse("kratos-alice"));
    }

    #[rstest]
    #[case("ory_kratos_session=stale")]
    #[case("ory_kratos_session=unknown")]
    #[tokio::test]
    async fn test_ory_cookie_rejected(#[case] cookie: &str) {
        assert_eq!(verifier().await.verify_cookie(cookie).await, None);
    }

    #[rstest]
    #[tokio::test]
    async fn test_ory_token_uses_ext_subject_and_scopes() {
        let verified = verifier().await.verify_bearer_token("good").await.unwrap();
        assert_eq!(verified.subject, ExternalId::parse("kratos-bob").unwrap());
        assert_eq!(verified.scopes, vec!["openid", "tasks:read"]);
    }

    #[rstest]
    #[case("no-ext")]
    #[case("revoked")]
    #[tokio::test]
    async fn test_ory_token_rejected(#[case] token: &str) {
        assert_eq!(verifier().await.verify_bearer_token(token).await, None);
    }

    #[rstest]
    #[tokio::test]
    async fn test_ory_unreachable_provider_is_rejection() {
        let verifier = OryCredentialVerifier::new(
            "http://127.0.0.1:1",
            "http://127.0.0.1:1",
            Duration::from_millis(200),
        )
        .unwrap();
        assert_eq!(verifier.verify_cookie("ory_kratos_session=good").await, None);
        assert_eq!(verifier.verify_bearer_token("good").await, None);
    }

    #[rstest]
    #[tokio::test]
    async fn test_static_verifier() {
        let alice = ExternalId::parse("alice").unwrap();
        let verifier = StaticCredentialVerifier::new()
            .with_cookie("ory_kratos_session=a", alice.clone())
            .with_token("t", alice.clone(), &["tasks:read"]);

        assert_eq!(verifier.verify_cookie("ory_kratos_session=a").await, Some(alice.clone()));
        assert_eq!(verifier.verify_cookie("ory_kratos_session=b").await, None);
        assert_eq!(
            verifier.verify_bearer_token("t").await.map(|token| token.subject),
            Some(alice)
        );
    }
}
