//! Router construction for the HTTP, webhook and health listeners.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::extract::attach_request_context;
use super::handlers::{create_task, delete_task, get_task, list_tasks, update_task};
use super::health::{health_check, metrics as metrics_handler};
use super::state::{AppState, WebhookState};
use super::webhook::identity_created;
use crate::telemetry::{HttpMetrics, track_metrics};

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Task CRUD routes plus the identity webhook.
pub fn http_router(state: AppState, webhook: WebhookState, metrics: HttpMetrics) -> Router {
    let tasks = Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route_layer(middleware::from_fn_with_state(
            metrics.clone(),
            track_metrics,
        ))
        .layer(middleware::from_fn_with_state(
            state.request_timeout,
            attach_request_context,
        ))
        .with_state(state);

    tasks
        .merge(webhook_router(webhook, metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors())
}

/// `POST /webhooks/kratos`.
pub fn webhook_router(state: WebhookState, metrics: HttpMetrics) -> Router {
    Router::new()
        .route("/webhooks/kratos", post(identity_created))
        .route_layer(middleware::from_fn_with_state(metrics, track_metrics))
        .layer(middleware::from_fn_with_state(
            state.request_timeout,
            attach_request_context,
        ))
        .with_state(state)
}

/// `GET /healthz` and `GET /metrics`. Not instrumented, so scrapes do not
/// show up in the request metrics.
pub fn health_router(metrics: HttpMetrics) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(metrics)
}
