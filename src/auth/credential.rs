//! Credential classification.
//!
//! A request carries at most one credential that counts. A non-empty
//! `Authorization` header always wins and must be a bearer token; the
//! session cookie is consulted only when that header is absent or empty.

use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};

use super::AuthError;

/// The credential a request presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Bearer token from the `Authorization` header.
    Bearer(String),
    /// Session cookie, as a `name=value` pair ready to forward.
    Cookie(String),
    /// Nothing usable was supplied.
    Missing,
}

impl Credential {
    /// Classifies the credential carried by `headers`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentialFormat` when a non-empty
    /// `Authorization` header is not valid UTF-8, does not have exactly two
    /// space-separated parts, uses a scheme other than `bearer` (any case),
    /// or has an empty token.
    pub fn from_headers(headers: &HeaderMap, cookie_name: &str) -> Result<Self, AuthError> {
        if let Some(value) = headers.get(AUTHORIZATION).filter(|value| !value.is_empty()) {
            let value = value
                .to_str()
                .map_err(|_| AuthError::InvalidCredentialFormat)?;
            return parse_bearer(value).map(Self::Bearer);
        }

        Ok(find_cookie(headers, cookie_name).map_or(Self::Missing, Self::Cookie))
    }
}

fn parse_bearer(value: &str) -> Result<String, AuthError> {
    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
            Ok((*token).to_string())
        }
        _ => Err(AuthError::InvalidCredentialFormat),
    }
}

fn find_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(name, value)| format!("{name}={value}"))
}

// =============================================================================
// Tests
// =============================================================================
