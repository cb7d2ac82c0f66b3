//! Shared state of the HTTP routers.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;

use crate::auth::PrincipalResolver;
use crate::service::TaskService;

/// Upper bound on a single request, applied to its [`crate::context::RequestContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimeout(pub Duration);

/// Dependencies of the task routes.
///
/// The RPC router reuses it, so both transports resolve principals the same
/// way and call the same service.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn TaskService>,
    pub resolver: Arc<PrincipalResolver>,
    pub request_timeout: RequestTimeout,
}

impl AppState {
    #[must_use]
    pub fn new(
        service: Arc<dyn TaskService>,
        resolver: Arc<PrincipalResolver>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            service,
            resolver,
            request_timeout: RequestTimeout(request_timeout),
        }
    }
}

impl FromRef<AppState> for Arc<PrincipalResolver> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.resolver)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AppState")
            .field("resolver", &self.resolver)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// Dependencies of the identity webhook.
#[derive(Clone)]
pub struct WebhookState {
    pub service: Arc<dyn TaskService>,
    /// Shared secret expected as `Authorization: Bearer <token>`.
    pub token: Option<String>,
    pub request_timeout: RequestTimeout,
}

impl WebhookState {
    #[must_use]
    pub fn new(
        service: Arc<dyn TaskService>,
        token: Option<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            service,
            token,
            request_timeout: RequestTimeout(request_timeout),
        }
    }
}

impl std::fmt::Debug for WebhookState {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("WebhookState")
            .field("token_configured", &self.token.is_some())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}
