//! JSON RPC surface.
//!
//! `taskmanager.v1.TaskManager` served as JSON over HTTP POST, one route per
//! method under [`SERVICE_PATH`], for clients without gRPC tooling. The gRPC
//! listener in [`crate::grpc`] serves the same methods in protobuf. Both share
//! principal resolution and the task service with the HTTP surface.

pub mod handlers;
pub mod messages;
pub mod status;

use axum::{Router, middleware, routing::post};
use tower_http::trace::TraceLayer;

use crate::api::{AppState, attach_request_context};
use crate::telemetry::{HttpMetrics, track_metrics};

pub use handlers::RpcPrincipal;
pub use messages::{Empty, TaskIdRequest, TaskList, TaskMessage};
pub use status::{RpcCode, RpcError};

/// Path prefix of every method.
pub const SERVICE_PATH: &str = "/taskmanager.v1.TaskManager";

/// Router for the RPC listener.
pub fn rpc_router(state: AppState, metrics: HttpMetrics) -> Router {
    Router::new()
        .route(
            &format!("{SERVICE_PATH}/CreateTask"),
            post(handlers::create_task),
        )
        .route(&format!("{SERVICE_PATH}/GetTask"), post(handlers::get_task))
        .route(
            &format!("{SERVICE_PATH}/UpdateTask"),
            post(handlers::update_task),
        )
        .route(
            &format!("{SERVICE_PATH}/DeleteTask"),
            post(handlers::delete_task),
        )
        .route(
            &format!("{SERVICE_PATH}/ListTasks"),
            post(handlers::list_tasks),
        )
        .route_layer(middleware::from_fn_with_state(metrics, track_metrics))
        .layer(middleware::from_fn_with_state(
            state.request_timeout,
            attach_request_context,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
