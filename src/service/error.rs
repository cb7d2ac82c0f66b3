//! Service errors and their transport-independent classification.

use thiserror::Error;

use crate::auth::AuthError;
use crate::domain::{DraftError, DueDateError, TaskId};
use crate::infrastructure::RepositoryError;

/// Error taxonomy shared by both transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    InvalidArgument,
    NotFound,
    /// Reserved for uniqueness violations; nothing produces it yet.
    Conflict,
    Cancelled,
    Internal,
}

/// Errors returned by [`super::TaskService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No principal could be resolved for the request.
    #[error("{0}")]
    Unauthenticated(String),

    /// Client input failed validation.
    #[error("{field}: {message}")]
    InvalidArgument {
        field: &'static str,
        message: String,
    },

    /// Missing, or owned by someone else.
    #[error("Task {0} not found")]
    NotFound(TaskId),

    /// Uniqueness violation. Reserved; no operation produces it yet.
    #[error("{0}")]
    Conflict(String),

    /// The request was cancelled before it could commit.
    #[error("Request cancelled")]
    Cancelled,

    /// Storage failure. The cause is for server logs only.
    #[error("Internal error during {operation}")]
    Internal {
        operation: &'static str,
        #[source]
        source: RepositoryError,
    },
}

impl ServiceError {
    /// Transport-independent classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Message safe to show to clients.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal { .. } => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }

    /// Translates a repository failure for `operation` on `task_id`.
    ///
    /// Internal causes are logged here and never reach the client.
    pub(crate) fn from_repository(
        operation: &'static str,
        task_id: Option<TaskId>,
        error: RepositoryError,
    ) -> Self {
        match (error, task_id) {
            (RepositoryError::NotFoundOrNotOwned, Some(id)) => Self::NotFound(id),
            (RepositoryError::Cancelled, _) => Self::Cancelled,
            (source, _) => {
                tracing::error!(operation, error = %source, "Repository failure");
                Self::Internal { operation, source }
            }
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Repository(source) => {
                Self::from_repository("resolve_principal", None, source)
            }
            other => Self::Unauthenticated(other.public_message()),
        }
    }
}

impl From<DraftError> for ServiceError {
    fn from(error: DraftError) -> Self {
        Self::InvalidArgument {
            field: error.field(),
            message: error.to_string(),
        }
    }
}

impl From<DueDateError> for ServiceError {
    fn from(error: DueDateError) -> Self {
        Self::InvalidArgument {
            field: "due_date",
            message: error.to_string(),
        }
    }
}
