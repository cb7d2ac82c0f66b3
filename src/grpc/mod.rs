//! gRPC surface.
//!
//! Serves `taskmanager.v1.TaskManager` (see
//! `proto/taskmanager/v1/taskmanager.proto`) on its own listener. Calls share
//! principal resolution, request contexts and the task service with the HTTP
//! surfaces; errors map to gRPC status codes.

pub mod proto;
pub mod service;
pub mod status;

use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

use crate::api::{AppState, attach_request_context};
use crate::telemetry::{HttpMetrics, track_metrics};

pub use service::GrpcTaskManager;
pub use status::code_for;

/// Fully qualified service name.
pub const SERVICE_NAME: &str = "taskmanager.v1.TaskManager";

const METHODS: [&str; 5] = ["CreateTask", "GetTask", "UpdateTask", "DeleteTask", "ListTasks"];

/// Router for the gRPC listener.
///
/// Each method gets its own route so metrics are labelled per method.
pub fn grpc_router(state: AppState, metrics: HttpMetrics) -> Router {
    let server = GrpcTaskManager::new(state.clone()).into_server();

    METHODS
        .iter()
        .fold(Router::new(), |router, method| {
            router.route_service(&format!("/{SERVICE_NAME}/{method}"), server.clone())
        })
        .route_layer(middleware::from_fn_with_state(metrics, track_metrics))
        .layer(middleware::from_fn_with_state(
            state.request_timeout,
            attach_request_context,
        ))
        .layer(TraceLayer::new_for_grpc())
}
