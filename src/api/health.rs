//! Liveness and metrics endpoints, served on their own listener.

use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
};

use super::error::ApiErrorResponse;
use crate::telemetry::HttpMetrics;

/// Content type of the Prometheus text exposition format.
pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// `GET /healthz`.
pub async fn health_check() -> &'static str {
    "OK"
}

/// `GET /metrics`.
///
/// # Errors
///
/// `500` if the registry cannot be encoded.
pub async fn metrics(
    State(metrics): State<HttpMetrics>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let body = metrics.encode_text().map_err(|error| {
        tracing::error!(%error, "Failed to encode metrics");
        ApiErrorResponse::internal_error("An internal error occurred")
    })?;

    Ok(([(CONTENT_TYPE, METRICS_CONTENT_TYPE)], body))
}
