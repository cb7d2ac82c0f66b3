//! `taskmanager.v1.TaskManager` methods.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRef, FromRequestParts, State, rejection::JsonRejection},
    http::request::Parts,
};

use super::messages::{Empty, TaskIdRequest, TaskList, TaskMessage};
use super::status::RpcError;
use crate::api::AppState;
use crate::api::extract::resolve_principal;
use crate::auth::PrincipalResolver;
use crate::context::RequestContext;
use crate::domain::{Principal, TaskId};
use crate::service::ServiceError;

/// The principal bound to an RPC call. Rejects with `unauthenticated`.
#[derive(Debug, Clone)]
pub struct RpcPrincipal(pub Principal);

impl<S> FromRequestParts<S> for RpcPrincipal
where
    Arc<PrincipalResolver>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = RpcError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        resolve_principal(parts, state)
            .await
            .map(Self)
            .map_err(RpcError::from)
    }
}

fn message<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, RpcError> {
    payload.map(|Json(body)| body).map_err(RpcError::from)
}

/// `CreateTask(Task) returns (Task)`.
///
/// # Errors
///
/// `unauthenticated`, `invalid_argument`, `canceled` or `internal`.
pub async fn create_task(
    State(state): State<AppState>,
    context: RequestContext,
    RpcPrincipal(principal): RpcPrincipal,
    payload: Result<Json<TaskMessage>, JsonRejection>,
) -> Result<Json<TaskMessage>, RpcError> {
    let draft = message(payload)?
        .into_draft()
        .map_err(ServiceError::from)?;

    let task = state.service.create_task(&context, &principal, draft).await?;
    Ok(Json(TaskMessage::from(&task)))
}

/// `GetTask(TaskIdRequest) returns (Task)`.
///
/// # Errors
///
/// `not_found` when the task is missing or owned by someone else.
pub async fn get_task(
    State(state): State<AppState>,
    context: RequestContext,
    RpcPrincipal(principal): RpcPrincipal,
    payload: Result<Json<TaskIdRequest>, JsonRejection>,
) -> Result<Json<TaskMessage>, RpcError> {
    let TaskIdRequest { id } = message(payload)?;
    let task = state
        .service
        .get_task(&context, &principal, TaskId::new(id))
        .await?;
    Ok(Json(TaskMessage::from(&task)))
}

/// `UpdateTask(Task) returns (Task)`. `createdAt` and `updatedAt` on input
/// are ignored.
///
/// # Errors
///
/// `invalid_argument` or `not_found`.
pub async fn update_task(
    State(state): State<AppState>,
    context: RequestContext,
    RpcPrincipal(principal): RpcPrincipal,
    payload: Result<Json<TaskMessage>, JsonRejection>,
) -> Result<Json<TaskMessage>, RpcError> {
    let request = message(payload)?;
    let id = TaskId::new(request.id);
    let draft = request.into_draft().map_err(ServiceError::from)?;

    let task = state
        .service
        .update_task(&context, &principal, id, draft)
        .await?;
    Ok(Json(TaskMessage::from(&task)))
}

/// `DeleteTask(TaskIdRequest) returns (Empty)`.
///
/// # Errors
///
/// `not_found` when the task is missing or owned by someone else.
pub async fn delete_task(
    State(state): State<AppState>,
    context: RequestContext,
    RpcPrincipal(principal): RpcPrincipal,
    payload: Result<Json<TaskIdRequest>, JsonRejection>,
) -> Result<Json<Empty>, RpcError> {
    let TaskIdRequest { id } = message(payload)?;
    state
        .service
        .delete_task(&context, &principal, TaskId::new(id))
        .await?;
    Ok(Json(Empty {}))
}

/// `ListTasks(Empty) returns (TaskList)`. The request body is not inspected.
///
/// # Errors
///
/// `unauthenticated`, `canceled` or `internal`.
pub async fn list_tasks(
    State(state): State<AppState>,
    context: RequestContext,
    RpcPrincipal(principal): RpcPrincipal,
) -> Result<Json<TaskList>, RpcError> {
    let tasks = state.service.list_tasks(&context, &principal).await?;
    Ok(Json(TaskList {
        tasks: tasks.iter().map(TaskMessage::from).collect(),
    }))
}
