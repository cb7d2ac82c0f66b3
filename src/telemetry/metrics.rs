//! Prometheus metrics for the HTTP and RPC listeners.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `http_requests_total` | Counter | `method`, `path` |
//! | `http_request_duration_seconds` | Histogram | `method`, `path` |
//!
//! `path` is the matched route template (`/tasks/{id}`), never the raw URI,
//! so label cardinality stays bounded.

use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Latency buckets in seconds.
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Label used when a request did not match any route.
const UNMATCHED_PATH: &str = "unmatched";

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Failed to register a metric.
    #[error("failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),

    /// Failed to encode the exposition text.
    #[error("failed to encode metrics: {0}")]
    Encoding(String),
}

/// Request metrics shared by every instrumented router.
///
/// Cloning is cheap and clones record into the same registry.
#[derive(Clone)]
pub struct HttpMetrics {
    registry: Registry,
    requests_total: CounterVec,
    request_duration: HistogramVec,
}

impl HttpMetrics {
    /// Creates the metrics and registers them with a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::Registration` if a metric fails to register.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests"),
            &["method", "path"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request latency in seconds",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["method", "path"],
        )?;
        registry.register(Box::new(request_duration.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
        })
    }

    /// Records one completed request.
    pub fn observe(&self, method: &str, path: &str, elapsed: Duration) {
        self.requests_total
            .with_label_values(&[method, path])
            .inc();
        self.request_duration
            .with_label_values(&[method, path])
            .observe(elapsed.as_secs_f64());
    }

    /// Returns the request count for a method and route.
    #[must_use]
    pub fn request_count(&self, method: &str, path: &str) -> f64 {
        self.requests_total
            .with_label_values(&[method, path])
            .get()
    }

    /// Renders all metrics in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::Encoding` if encoding fails.
    pub fn encode_text(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|error| MetricsError::Encoding(error.to_string()))?;
        String::from_utf8(buffer).map_err(|error| MetricsError::Encoding(error.to_string()))
    }
}

impl std::fmt::Debug for HttpMetrics {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("HttpMetrics").finish_non_exhaustive()
    }
}

/// Middleware recording [`HttpMetrics`] for every routed request.
///
/// Install with `route_layer` so that [`MatchedPath`] is available.
pub async fn track_metrics(
    State(metrics): State<HttpMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_PATH.to_string(), |matched| matched.as_str().to_string());

    let response = next.run(request).await;

    metrics.observe(&method, &path, started.elapsed());
    response
}
