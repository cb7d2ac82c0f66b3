//! Task handlers of the HTTP surface.
//!
//! Every handler authenticates before reading its body, so a request without
//! a principal is rejected with `401` regardless of what else is wrong with it.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

use super::dto::{TaskRequest, TaskResponse};
use super::error::ApiErrorResponse;
use super::extract::Authenticated;
use super::state::AppState;
use crate::context::RequestContext;
use crate::domain::TaskId;
use crate::service::ServiceError;

fn task_id(raw: &str) -> Result<TaskId, ApiErrorResponse> {
    raw.parse::<TaskId>().map_err(ApiErrorResponse::from)
}

fn task_request(
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<TaskRequest, ApiErrorResponse> {
    payload
        .map(|Json(request)| request)
        .map_err(ApiErrorResponse::from)
}

// =============================================================================
// GET /tasks
// =============================================================================

/// Lists the caller's tasks ordered by id.
///
/// # Errors
///
/// `401` without a principal, `408` if cancelled, `500` on storage failure.
pub async fn list_tasks(
    State(state): State<AppState>,
    context: RequestContext,
    Authenticated(principal): Authenticated,
) -> Result<Json<Vec<TaskResponse>>, ApiErrorResponse> {
    let tasks = state.service.list_tasks(&context, &principal).await?;
    Ok(Json(tasks.iter().map(TaskResponse::from).collect()))
}

// =============================================================================
// POST /tasks
// =============================================================================

/// Creates a task owned by the caller.
///
/// # Response
///
/// - **201 Created**: the stored task
/// - **400 Bad Request**: malformed body, invalid field or due date
/// - **401 Unauthorized**: no principal
///
/// # Errors
///
/// See above; `500` on storage failure.
pub async fn create_task(
    State(state): State<AppState>,
    context: RequestContext,
    Authenticated(principal): Authenticated,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiErrorResponse> {
    let draft = task_request(payload)?
        .into_draft()
        .map_err(ServiceError::from)?;

    let task = state.service.create_task(&context, &principal, draft).await?;
    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

// =============================================================================
// GET /tasks/{id}
// =============================================================================

/// Fetches one of the caller's tasks.
///
/// # Errors
///
/// `400` for a non-numeric id, `404` when missing or not owned.
pub async fn get_task(
    State(state): State<AppState>,
    context: RequestContext,
    Authenticated(principal): Authenticated,
    Path(raw_id): Path<String>,
) -> Result<Json<TaskResponse>, ApiErrorResponse> {
    let id = task_id(&raw_id)?;
    let task = state.service.get_task(&context, &principal, id).await?;
    Ok(Json(TaskResponse::from(task)))
}

// =============================================================================
// PUT /tasks/{id}
// =============================================================================

/// Replaces the client-controlled fields of one of the caller's tasks.
///
/// # Errors
///
/// `400` for a bad id or body, `404` when missing or not owned.
pub async fn update_task(
    State(state): State<AppState>,
    context: RequestContext,
    Authenticated(principal): Authenticated,
    Path(raw_id): Path<String>,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<Json<TaskResponse>, ApiErrorResponse> {
    let id = task_id(&raw_id)?;
    let draft = task_request(payload)?
        .into_draft()
        .map_err(ServiceError::from)?;

    let task = state
        .service
        .update_task(&context, &principal, id, draft)
        .await?;
    Ok(Json(TaskResponse::from(task)))
}

// =============================================================================
// DELETE /tasks/{id}
// =============================================================================

/// Deletes one of the caller's tasks.
///
/// # Errors
///
/// `400` for a bad id, `404` when missing or not owned.
pub async fn delete_task(
    State(state): State<AppState>,
    context: RequestContext,
    Authenticated(principal): Authenticated,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiErrorResponse> {
    let id = task_id(&raw_id)?;
    state.service.delete_task(&context, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
