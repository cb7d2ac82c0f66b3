//! Identity-provider webhook.
//!
//! The identity provider calls `POST /webhooks/kratos` after registering an
//! identity. Materialization is idempotent, so redelivered events are safe.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
};
use serde::Deserialize;

use super::error::{ApiErrorResponse, FieldError};
use super::state::WebhookState;
use crate::context::RequestContext;
use crate::domain::ExternalId;

/// Body sent by the identity provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityCreated {
    #[serde(default)]
    pub user_id: String,
}

/// Creates the local user for a newly registered identity.
///
/// # Errors
///
/// - `401` when a shared secret is configured and the request lacks it
/// - `400` for a malformed body or a missing/blank `userId`
/// - `500` on storage failure
pub async fn identity_created(
    State(state): State<WebhookState>,
    context: RequestContext,
    headers: HeaderMap,
    payload: Result<Json<IdentityCreated>, JsonRejection>,
) -> Result<StatusCode, ApiErrorResponse> {
    if let Some(expected) = state.token.as_deref()
        && !carries_token(&headers, expected)
    {
        tracing::warn!("Webhook call rejected: missing or wrong shared secret");
        return Err(ApiErrorResponse::unauthorized("Unauthorized"));
    }

    let Json(event) = payload?;
    let Some(external_id) = ExternalId::parse(&event.user_id) else {
        return Err(ApiErrorResponse::validation_error(
            "Validation failed",
            vec![FieldError::new("userId", "userId is required")],
        ));
    };

    state.service.materialize_user(&context, &external_id).await?;
    Ok(StatusCode::OK)
}

fn carries_token(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| constant_time_eq(token.as_bytes(), expected.as_bytes()))
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .fold(0u8, |difference, (a, b)| difference | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use rstest::rstest;

    fn headers(authorization: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = authorization {
            headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        }
        headers
    }

    #[rstest]
    #[case(Some("Bearer s3cret"), true)]
    #[case(Some("Bearer s3cre"), false)]
    #[case(Some("Bearer s3cret "), false)]
    #[case(Some("Basic s3cret"), false)]
    #[case(Some("s3cret"), false)]
    #[case(None, false)]
    fn test_carries_token(#[case] authorization: Option<&'static str>, #[case] expected: bool) {
        assert_eq!(carries_token(&headers(authorization), "s3cret"), expected);
    }

    #[rstest]
    fn test_event_tolerates_missing_user_id() {
        let event: IdentityCreated = serde_json::from_str("{}").unwrap();
        assert!(ExternalId::parse(&event.user_id).is_none());
    }
}
