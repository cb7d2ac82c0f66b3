//! `PostgreSQL` repository implementations.
//!
//! Every method goes through [`run_in_transaction`], so each call is one
//! transaction that commits on success and rolls back on error or
//! cancellation. Ownership is enforced in the `WHERE` clause of every task
//! statement.
//!
//! # Table Schema
//!
//! See `migrations/0001_create_users_and_tasks.sql`:
//!
//! ```sql
//! CREATE TABLE users (
//!     id UUID PRIMARY KEY,
//!     external_id TEXT NOT NULL UNIQUE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//!
//! CREATE TABLE tasks (
//!     id SERIAL PRIMARY KEY,
//!     user_id UUID NOT NULL REFERENCES users (id),
//!     title TEXT NOT NULL,
//!     description TEXT NOT NULL DEFAULT '',
//!     due_date TIMESTAMPTZ,
//!     completed BOOLEAN NOT NULL DEFAULT FALSE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::domain::{ExternalId, Task, TaskDraft, TaskId, User, UserId};
use crate::infrastructure::{RepositoryError, TaskRepository, UserRepository, run_in_transaction};

/// Sequence generator limit exceeded.
const SQLSTATE_SEQUENCE_EXHAUSTED: &str = "2200H";
/// Numeric value out of range.
const SQLSTATE_NUMERIC_OUT_OF_RANGE: &str = "22003";

const TASK_COLUMNS: &str =
    "id, user_id, title, description, due_date, completed, created_at, updated_at";

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: i32,
    user_id: Uuid,
    title: String,
    description: String,
    due_date: Option<DateTime<Utc>>,
    completed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Self {
            id: TaskId::new(row.id),
            owner_id: UserId::from_uuid(row.user_id),
            title: row.title,
            description: row.description,
            due_date: row.due_date,
            completed: row.completed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    external_id: String,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let external_id = ExternalId::parse(&row.external_id).ok_or_else(|| {
            RepositoryError::database("decode user", format!("blank external_id for {}", row.id))
        })?;
        Ok(Self::new(UserId::from_uuid(row.id), external_id))
    }
}

/// Maps insert failures, recognising id exhaustion.
fn map_insert_error(error: &sqlx::Error) -> RepositoryError {
    let code = error
        .as_database_error()
        .and_then(|database_error| database_error.code());

    match code.as_deref() {
        Some(SQLSTATE_SEQUENCE_EXHAUSTED | SQLSTATE_NUMERIC_OUT_OF_RANGE) => {
            RepositoryError::IdExhausted
        }
        _ => RepositoryError::database("insert task", error),
    }
}

// =============================================================================
// PostgreSQL Task Repository
// =============================================================================

/// `PostgreSQL` implementation of `TaskRepository`.
///
/// # Example
///
/// ```ignore
/// let pool = PgPool::connect("postgres://localhost/tasks").await?;
/// let repository = PostgresTaskRepository::new(pool);
/// let task = repository.create(&context, &owner_id, TaskDraft::new("A")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    /// Creates a new `PostgreSQL` task repository with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn create(
        &self,
        context: &RequestContext,
        owner_id: &UserId,
        draft: TaskDraft,
    ) -> Result<Task, RepositoryError> {
        let owner = *owner_id.as_uuid();

        run_in_transaction(&self.pool, context, "create_task", move |connection| {
            Box::pin(async move {
                let row: TaskRow = sqlx::query_as(&format!(
                    "INSERT INTO tasks (user_id, title, description, due_date, completed) \
                     VALUES ($1, $2, $3, $4, $5) RETURNING {TASK_COLUMNS}"
                ))
                .bind(owner)
                .bind(&draft.title)
                .bind(&draft.description)
                .bind(draft.due_date)
                .bind(draft.completed)
                .fetch_one(&mut *connection)
                .await
                .map_err(|error| map_insert_error(&error))?;

                Ok(Task::from(row))
            })
        })
        .await
    }

    async fn get(
        &self,
        context: &RequestContext,
        id: TaskId,
        owner_id: &UserId,
    ) -> Result<Option<Task>, RepositoryError> {
        let owner = *owner_id.as_uuid();

        run_in_transaction(&self.pool, context, "get_task", move |connection| {
            Box::pin(async move {
                let row: Option<TaskRow> = sqlx::query_as(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND user_id = $2"
                ))
                .bind(id.as_i32())
                .bind(owner)
                .fetch_optional(&mut *connection)
                .await
                .map_err(|error| RepositoryError::database("select task", error))?;

                Ok(row.map(Task::from))
            })
        })
        .await
    }

    async fn update(
        &self,
        context: &RequestContext,
        id: TaskId,
        owner_id: &UserId,
        draft: TaskDraft,
    ) -> Result<Task, RepositoryError> {
        let owner = *owner_id.as_uuid();

        run_in_transaction(&self.pool, context, "update_task", move |connection| {
            Box::pin(async move {
                let row: Option<TaskRow> = sqlx::query_as(&format!(
                    "UPDATE tasks \
                     SET title = $1, description = $2, due_date = $3, completed = $4, \
                         updated_at = NOW() \
                     WHERE id = $5 AND user_id = $6 \
                     RETURNING {TASK_COLUMNS}"
                ))
                .bind(&draft.title)
                .bind(&draft.description)
                .bind(draft.due_date)
                .bind(draft.completed)
                .bind(id.as_i32())
                .bind(owner)
                .fetch_optional(&mut *connection)
                .await
                .map_err(|error| RepositoryError::database("update task", error))?;

                row.map(Task::from)
                    .ok_or(RepositoryError::NotFoundOrNotOwned)
            })
        })
        .await
    }

    async fn delete(
        &self,
        context: &RequestContext,
        id: TaskId,
        owner_id: &UserId,
    ) -> Result<(), RepositoryError> {
        let owner = *owner_id.as_uuid();

        run_in_transaction(&self.pool, context, "delete_task", move |connection| {
            Box::pin(async move {
                let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
                    .bind(id.as_i32())
                    .bind(owner)
                    .execute(&mut *connection)
                    .await
                    .map_err(|error| RepositoryError::database("delete task", error))?;

                if result.rows_affected() == 0 {
                    return Err(RepositoryError::NotFoundOrNotOwned);
                }
                Ok(())
            })
        })
        .await
    }

    async fn list(
        &self,
        context: &RequestContext,
        owner_id: &UserId,
    ) -> Result<Vec<Task>, RepositoryError> {
        let owner = *owner_id.as_uuid();

        run_in_transaction(&self.pool, context, "list_tasks", move |connection| {
            Box::pin(async move {
                let rows: Vec<TaskRow> = sqlx::query_as(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1 ORDER BY id ASC"
                ))
                .bind(owner)
                .fetch_all(&mut *connection)
                .await
                .map_err(|error| RepositoryError::database("list tasks", error))?;

                Ok(rows.into_iter().map(Task::from).collect())
            })
        })
        .await
    }
}

// =============================================================================
// PostgreSQL User Repository
// =============================================================================

/// `PostgreSQL` implementation of `UserRepository`.
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a new `PostgreSQL` user repository with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_external_id(
        &self,
        context: &RequestContext,
        external_id: &ExternalId,
    ) -> Result<Option<User>, RepositoryError> {
        let external_id = external_id.as_str().to_string();

        run_in_transaction(&self.pool, context, "find_user", move |connection| {
            Box::pin(async move {
                let row: Option<UserRow> =
                    sqlx::query_as("SELECT id, external_id FROM users WHERE external_id = $1")
                        .bind(&external_id)
                        .fetch_optional(&mut *connection)
                        .await
                        .map_err(|error| RepositoryError::database("select user", error))?;

                row.map(User::try_from).transpose()
            })
        })
        .await
    }

    async fn materialize(
        &self,
        context: &RequestContext,
        external_id: &ExternalId,
    ) -> Result<User, RepositoryError> {
        let external_id = external_id.as_str().to_string();
        let candidate_id = *UserId::generate().as_uuid();

        run_in_transaction(&self.pool, context, "materialize_user", move |connection| {
            Box::pin(async move {
                sqlx::query(
                    "INSERT INTO users (id, external_id) VALUES ($1, $2) \
                     ON CONFLICT (external_id) DO NOTHING",
                )
                .bind(candidate_id)
                .bind(&external_id)
                .execute(&mut *connection)
                .await
                .map_err(|error| RepositoryError::database("insert user", error))?;

                let row: UserRow =
                    sqlx::query_as("SELECT id, external_id FROM users WHERE external_id = $1")
                        .bind(&external_id)
                        .fetch_one(&mut *connection)
                        .await
                        .map_err(|error| RepositoryError::database("select user", error))?;

                User::try_from(row)
            })
        })
        .await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    async fn connect() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn unique_subject(prefix: &str) -> ExternalId {
        ExternalId::parse(&format!("{prefix}-{}", Uuid::new_v4())).unwrap()
    }

    #[rstest]
    #[tokio::test]
    #[ignore = "requires PostgreSQL (DATABASE_URL)"]
    async fn test_postgres_ownership_scoping() {
        let pool = connect().await;
        let context = RequestContext::new();
        let users = PostgresUserRepository::new(pool.clone());
        let tasks = PostgresTaskRepository::new(pool);
        let alice = users
            .materialize(&context, &unique_subject("alice"))
            .await
            .unwrap();
        let bob = users
            .materialize(&context, &unique_subject("bob"))
            .await
            .unwrap();

        let task = tasks
            .create(&context, &alice.id, TaskDraft::new("A"))
            .await
            .unwrap();

        assert_eq!(tasks.get(&context, task.id, &bob.id).await.unwrap(), None);
        assert_eq!(
            tasks
                .update(&context, task.id, &bob.id, TaskDraft::new("B"))
                .await,
            Err(RepositoryError::NotFoundOrNotOwned)
        );
        assert_eq!(
            tasks.delete(&context, task.id, &bob.id).await,
            Err(RepositoryError::NotFoundOrNotOwned)
        );
        assert_eq!(
            tasks.get(&context, task.id, &alice.id).await.unwrap(),
            Some(task.clone())
        );

        tasks.delete(&context, task.id, &alice.id).await.unwrap();
        assert_eq!(tasks.get(&context, task.id, &alice.id).await.unwrap(), None);
    }

    #[rstest]
    #[tokio::test]
    #[ignore = "requires PostgreSQL (DATABASE_URL)"]
    async fn test_postgres_materialize_is_idempotent() {
        let pool = connect().await;
        let context = RequestContext::new();
        let users = PostgresUserRepository::new(pool);
        let subject = unique_subject("webhook");

        let first = users.materialize(&context, &subject).await.unwrap();
        let second = users.materialize(&context, &subject).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            users.find_by_external_id(&context, &subject).await.unwrap(),
            Some(first)
        );
    }

    #[rstest]
    #[tokio::test]
    #[ignore = "requires PostgreSQL (DATABASE_URL)"]
    async fn test_postgres_cancelled_create_is_not_committed() {
        let pool = connect().await;
        let context = RequestContext::new();
        let users = PostgresUserRepository::new(pool.clone());
        let tasks = PostgresTaskRepository::new(pool);
        let owner = users
            .materialize(&context, &unique_subject("cancel"))
            .await
            .unwrap();

        let cancelled = RequestContext::new();
        cancelled.cancel();
        let result = tasks
            .create(&cancelled, &owner.id, TaskDraft::new("A"))
            .await;

        assert_eq!(result, Err(RepositoryError::Cancelled));
        assert!(tasks.list(&context, &owner.id).await.unwrap().is_empty());
    }

    #[rstest]
    #[tokio::test]
    #[ignore = "requires PostgreSQL (DATABASE_URL)"]
    async fn test_postgres_cancel_mid_transaction_rolls_back_insert() {
        let pool = connect().await;
        let context = RequestContext::new();
        let users = PostgresUserRepository::new(pool.clone());
        let tasks = PostgresTaskRepository::new(pool.clone());
        let owner = users
            .materialize(&context, &unique_subject("mid-cancel"))
            .await
            .unwrap();
        let owner_uuid = *owner.id.as_uuid();

        let cancelled = RequestContext::new();
        let canceller = cancelled.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let result = run_in_transaction(&pool, &cancelled, "insert_then_sleep", move |connection| {
            Box::pin(async move {
                sqlx::query("INSERT INTO tasks (user_id, title) VALUES ($1, $2)")
                    .bind(owner_uuid)
                    .bind("written before cancel")
                    .execute(&mut *connection)
                    .await
                    .map_err(|error| RepositoryError::database("insert task", error))?;
                sqlx::query("SELECT pg_sleep(1)")
                    .execute(&mut *connection)
                    .await
                    .map_err(|error| RepositoryError::database("sleep", error))?;
                Ok(())
            })
        })
        .await;

        assert_eq!(result, Err(RepositoryError::Cancelled));
        assert!(tasks.list(&context, &owner.id).await.unwrap().is_empty());
    }
}
