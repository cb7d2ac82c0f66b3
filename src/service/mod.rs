//! Task service.
//!
//! [`TaskService`] is the interface both transports call. Every task
//! operation takes the resolved [`Principal`] explicitly and is scoped to it.

pub mod error;
pub mod task_manager;

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::domain::{ExternalId, Principal, Task, TaskDraft, TaskId, User};

pub use error::{ErrorKind, ServiceError};
pub use task_manager::TaskManager;

/// Task operations available to the HTTP and RPC surfaces.
#[async_trait]
pub trait TaskService: Send + Sync {
    /// Validates `draft` and stores it as a new task owned by `principal`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument`, `Cancelled` or `Internal`.
    async fn create_task(
        &self,
        context: &RequestContext,
        principal: &Principal,
        draft: TaskDraft,
    ) -> Result<Task, ServiceError>;

    /// Fetches one of the principal's tasks.
    ///
    /// # Errors
    ///
    /// `NotFound` if the task is missing or owned by someone else.
    async fn get_task(
        &self,
        context: &RequestContext,
        principal: &Principal,
        id: TaskId,
    ) -> Result<Task, ServiceError>;

    /// Replaces the client-controlled fields of one of the principal's tasks.
    ///
    /// # Errors
    ///
    /// `InvalidArgument`, `NotFound`, `Cancelled` or `Internal`.
    async fn update_task(
        &self,
        context: &RequestContext,
        principal: &Principal,
        id: TaskId,
        draft: TaskDraft,
    ) -> Result<Task, ServiceError>;

    /// Deletes one of the principal's tasks.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Cancelled` or `Internal`.
    async fn delete_task(
        &self,
        context: &RequestContext,
        principal: &Principal,
        id: TaskId,
    ) -> Result<(), ServiceError>;

    /// Lists the principal's tasks ordered by id.
    ///
    /// # Errors
    ///
    /// `Cancelled` or `Internal`.
    async fn list_tasks(
        &self,
        context: &RequestContext,
        principal: &Principal,
    ) -> Result<Vec<Task>, ServiceError>;

    /// Creates the user for `external_id` if it does not exist yet.
    ///
    /// # Errors
    ///
    /// `Cancelled` or `Internal`.
    async fn materialize_user(
        &self,
        context: &RequestContext,
        external_id: &ExternalId,
    ) -> Result<User, ServiceError>;
}
