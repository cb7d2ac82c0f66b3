//! Ownership-scoped task operations.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ServiceError, TaskService};
use crate::context::RequestContext;
use crate::domain::{ExternalId, Principal, Task, TaskDraft, TaskId, User};
use crate::infrastructure::{TaskRepository, UserRepository};

/// [`TaskService`] over the task and user repositories.
#[derive(Clone)]
pub struct TaskManager {
    tasks: Arc<dyn TaskRepository>,
    users: Arc<dyn UserRepository>,
}

impl TaskManager {
    /// Creates a service over the given repositories.
    #[must_use]
    pub fn new(tasks: Arc<dyn TaskRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { tasks, users }
    }
}

impl std::fmt::Debug for TaskManager {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("TaskManager").finish_non_exhaustive()
    }
}

#[async_trait]
impl TaskService for TaskManager {
    async fn create_task(
        &self,
        context: &RequestContext,
        principal: &Principal,
        draft: TaskDraft,
    ) -> Result<Task, ServiceError> {
        let user_id = principal.user_id();
        tracing::debug!(%user_id, "Creating task");
        draft.validate()?;

        let task = self
            .tasks
            .create(context, user_id, draft)
            .await
            .map_err(|error| ServiceError::from_repository("create_task", None, error))?;

        tracing::debug!(%user_id, task_id = %task.id, "Task created");
        Ok(task)
    }

    async fn get_task(
        &self,
        context: &RequestContext,
        principal: &Principal,
        id: TaskId,
    ) -> Result<Task, ServiceError> {
        let user_id = principal.user_id();
        tracing::debug!(%user_id, task_id = %id, "Fetching task");

        let task = self
            .tasks
            .get(context, id, user_id)
            .await
            .map_err(|error| ServiceError::from_repository("get_task", Some(id), error))?
            .ok_or(ServiceError::NotFound(id))?;

        tracing::debug!(%user_id, task_id = %id, "Task fetched");
        Ok(task)
    }

    async fn update_task(
        &self,
        context: &RequestContext,
        principal: &Principal,
        id: TaskId,
        draft: TaskDraft,
    ) -> Result<Task, ServiceError> {
        let user_id = principal.user_id();
        tracing::debug!(%user_id, task_id = %id, "Updating task");
        draft.validate()?;

        let task = self
            .tasks
            .update(context, id, user_id, draft)
            .await
            .map_err(|error| ServiceError::from_repository("update_task", Some(id), error))?;

        tracing::debug!(%user_id, task_id = %id, "Task updated");
        Ok(task)
    }

    async fn delete_task(
        &self,
        context: &RequestContext,
        principal: &Principal,
        id: TaskId,
    ) -> Result<(), ServiceError> {
        let user_id = principal.user_id();
        tracing::debug!(%user_id, task_id = %id, "Deleting task");

        self.tasks
            .delete(context, id, user_id)
            .await
            .map_err(|error| ServiceError::from_repository("delete_task", Some(id), error))?;

        tracing::debug!(%user_id, task_id = %id, "Task deleted");
        Ok(())
    }

    async fn list_tasks(
        &self,
        context: &RequestContext,
        principal: &Principal,
    ) -> Result<Vec<Task>, ServiceError> {
        let user_id = principal.user_id();
        tracing::debug!(%user_id, "Listing tasks");

        let tasks = self
            .tasks
            .list(context, user_id)
            .await
            .map_err(|error| ServiceError::from_repository("list_tasks", None, error))?;

        tracing::debug!(%user_id, count = tasks.len(), "Tasks listed");
        Ok(tasks)
    }

    async fn materialize_user(
        &self,
        context: &RequestContext,
        external_id: &ExternalId,
    ) -> Result<User, ServiceError> {
        tracing::debug!(%external_id, "Materializing user");

        let user = self
            .users
            .materialize(context, external_id)
            .await
            .map_err(|error| ServiceError::from_repository("materialize_user", None, error))?;

        tracing::info!(user_id = %user.id, %external_id, "User materialized");
        Ok(user)
    }
}

// =============================================================================
// Tests
// =============================================================================
