//! Repository traits for domain entities.
//!
//! Every method runs inside its own transaction and takes the request's
//! [`RequestContext`]. A cancelled context is never committed. Task methods
//! always filter by owner, so a task belonging to someone else is
//! indistinguishable from a missing one.

use async_trait::async_trait;
use thiserror::Error;

use crate::context::{Cancelled, RequestContext};
use crate::domain::{ExternalId, Task, TaskDraft, TaskId, User, UserId};

// =============================================================================
// Repository Error
// =============================================================================

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// No row matched both the id and the owner.
    #[error("Task not found or not owned by the caller")]
    NotFoundOrNotOwned,

    /// The request was cancelled and the transaction rolled back.
    #[error("Operation cancelled")]
    Cancelled,

    /// The task id sequence ran past `i32::MAX`.
    #[error("Task id sequence exhausted")]
    IdExhausted,

    /// Any other storage failure.
    #[error("Database error during {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },
}

impl RepositoryError {
    /// Wraps a storage error with the name of the failing step.
    pub fn database(operation: &'static str, error: impl std::fmt::Display) -> Self {
        Self::Database {
            operation,
            message: error.to_string(),
        }
    }
}

impl From<Cancelled> for RepositoryError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

// =============================================================================
// Task Repository
// =============================================================================

/// Ownership-scoped task storage.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Inserts a task owned by `owner_id` and returns it with its new id.
    ///
    /// # Errors
    ///
    /// `IdExhausted` when no id can be allocated, `Cancelled`, or `Database`.
    async fn create(
        &self,
        context: &RequestContext,
        owner_id: &UserId,
        draft: TaskDraft,
    ) -> Result<Task, RepositoryError>;

    /// Fetches a task by id, only if `owner_id` owns it.
    ///
    /// # Errors
    ///
    /// `Cancelled` or `Database`. Absence is `Ok(None)`.
    async fn get(
        &self,
        context: &RequestContext,
        id: TaskId,
        owner_id: &UserId,
    ) -> Result<Option<Task>, RepositoryError>;

    /// Replaces the client-controlled fields and refreshes `updated_at`.
    ///
    /// # Errors
    ///
    /// `NotFoundOrNotOwned` when zero rows matched, `Cancelled`, or `Database`.
    async fn update(
        &self,
        context: &RequestContext,
        id: TaskId,
        owner_id: &UserId,
        draft: TaskDraft,
    ) -> Result<Task, RepositoryError>;

    /// Hard-deletes a task.
    ///
    /// # Errors
    ///
    /// `NotFoundOrNotOwned` when zero rows matched, `Cancelled`, or `Database`.
    async fn delete(
        &self,
        context: &RequestContext,
        id: TaskId,
        owner_id: &UserId,
    ) -> Result<(), RepositoryError>;

    /// Lists every task owned by `owner_id`, ordered by id ascending.
    ///
    /// # Errors
    ///
    /// `Cancelled` or `Database`.
    async fn list(
        &self,
        context: &RequestContext,
        owner_id: &UserId,
    ) -> Result<Vec<Task>, RepositoryError>;
}

// =============================================================================
// User Repository
// =============================================================================

/// Mapping between identity-provider subjects and internal users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Looks up the user bound to an external identity.
    ///
    /// # Errors
    ///
    /// `Cancelled` or `Database`. Absence is `Ok(None)`.
    async fn find_by_external_id(
        &self,
        context: &RequestContext,
        external_id: &ExternalId,
    ) -> Result<Option<User>, RepositoryError>;

    /// Returns the user for `external_id`, creating it if needed.
    ///
    /// Idempotent: repeated or concurrent calls yield the same single user.
    ///
    /// # Errors
    ///
    /// `Cancelled` or `Database`.
    async fn materialize(
        &self,
        context: &RequestContext,
        external_id: &ExternalId,
    ) -> Result<User, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_cancelled_converts() {
        assert_eq!(RepositoryError::from(Cancelled), RepositoryError::Cancelled);
    }

    #[rstest]
    fn test_database_error_keeps_operation() {
        let error = RepositoryError::database("commit", "connection reset");
        assert_eq!(
            error.to_string(),
            "Database error during commit: connection reset"
        );
    }
}
