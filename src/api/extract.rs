//! Request context and principal extraction.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use super::error::ApiErrorResponse;
use super::state::RequestTimeout;
use crate::auth::PrincipalResolver;
use crate::context::RequestContext;
use crate::domain::Principal;
use crate::service::ServiceError;

/// Middleware giving every request its own [`RequestContext`].
///
/// The context expires after the configured timeout and is cancelled as soon
/// as the request future is dropped, e.g. when the client disconnects.
pub async fn attach_request_context(
    State(RequestTimeout(timeout)): State<RequestTimeout>,
    mut request: Request,
    next: Next,
) -> Response {
    let context = RequestContext::with_timeout(timeout);
    let _cancel_on_drop = context.cancel_on_drop();
    request.extensions_mut().insert(context);
    next.run(request).await
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(context_of(parts))
    }
}

/// The principal bound to an HTTP request.
///
/// Rejects with `401` when no principal can be resolved.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

impl<S> FromRequestParts<S> for Authenticated
where
    Arc<PrincipalResolver>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiErrorResponse;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        resolve_principal(parts, state)
            .await
            .map(Self)
            .map_err(ApiErrorResponse::from)
    }
}

/// Resolves the principal for `parts` with the state's resolver.
///
/// Shared by both transports so a request authenticates identically over
/// HTTP and RPC.
///
/// # Errors
///
/// Returns the resolver failure translated to a [`ServiceError`].
pub(crate) async fn resolve_principal<S>(parts: &Parts, state: &S) -> Result<Principal, ServiceError>
where
    Arc<PrincipalResolver>: FromRef<S>,
    S: Send + Sync,
{
    let resolver = Arc::<PrincipalResolver>::from_ref(state);
    let context = context_of(parts);

    resolver
        .resolve_headers(&context, &parts.headers)
        .await
        .map_err(|error| {
            tracing::debug!(%error, "Request not authenticated");
            ServiceError::from(error)
        })
}

fn context_of(parts: &Parts) -> RequestContext {
    parts
        .extensions
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default()
}
