//! Repository factory for runtime backend selection.
//!
//! Builds the task and user repositories for the configured
//! [`StorageMode`]. The `PostgreSQL` backend owns a connection pool which
//! [`Repositories::close`] releases at shutdown.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use super::{
    InMemoryStore, InMemoryTaskRepository, InMemoryUserRepository, PostgresTaskRepository,
    PostgresUserRepository, TaskRepository, UserRepository,
};
use crate::config::{ConfigurationError, StorageConfig, StorageMode};

const POOL_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during factory initialization.
#[derive(Debug, Error)]
pub enum FactoryError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    DatabaseConnection(String),

    /// Schema migration error.
    #[error("Database migration error: {0}")]
    Migration(String),
}

// =============================================================================
// Repository Factory
// =============================================================================

/// Collection of initialized repositories.
#[derive(Clone)]
pub struct Repositories {
    /// Task repository for task CRUD operations.
    pub task_repository: Arc<dyn TaskRepository>,
    /// User repository for identity mapping.
    pub user_repository: Arc<dyn UserRepository>,
    pool: Option<PgPool>,
}

impl Repositories {
    /// Builds repositories sharing one in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        let store = InMemoryStore::new();
        Self {
            task_repository: Arc::new(InMemoryTaskRepository::with_store(store.clone())),
            user_repository: Arc::new(InMemoryUserRepository::with_store(store)),
            pool: None,
        }
    }

    /// Builds repositories over an existing `PostgreSQL` pool.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            task_repository: Arc::new(PostgresTaskRepository::new(pool.clone())),
            user_repository: Arc::new(PostgresUserRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Closes the connection pool, if any. Waits for checked-out connections.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
            tracing::info!("Database connection pool closed");
        }
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Repositories")
            .field("task_repository", &"Arc<dyn TaskRepository>")
            .field("user_repository", &"Arc<dyn UserRepository>")
            .field("pool", &self.pool.is_some())
            .finish()
    }
}

/// Factory for creating repository instances based on configuration.
///
/// # Example
///
/// ```ignore
/// let factory = RepositoryFactory::new(config.storage.clone());
/// let repositories = factory.create().await?;
/// ```
#[derive(Debug, Clone)]
pub struct RepositoryFactory {
    config: StorageConfig,
}

impl RepositoryFactory {
    /// Creates a new repository factory with the given configuration.
    #[must_use]
    pub const fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Creates all repositories based on the configuration.
    ///
    /// # Errors
    ///
    /// Returns `FactoryError` if:
    /// - `DATABASE_URL` is missing in `postgres` mode
    /// - the database is unreachable
    /// - migrations fail (when enabled)
    pub async fn create(&self) -> Result<Repositories, FactoryError> {
        match self.config.mode {
            StorageMode::InMemory => Ok(Repositories::in_memory()),
            StorageMode::Postgres => {
                let pool = self.create_postgres_pool().await?;
                if self.config.run_migrations {
                    Self::run_migrations(&pool).await?;
                }
                Ok(Repositories::postgres(pool))
            }
        }
    }

    /// Creates a `PostgreSQL` connection pool.
    async fn create_postgres_pool(&self) -> Result<PgPool, FactoryError> {
        let database_url = self
            .config
            .database_url
            .as_ref()
            .ok_or(ConfigurationError::MissingDatabaseUrl)?;

        PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .acquire_timeout(POOL_ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await
            .map_err(|error| FactoryError::DatabaseConnection(error.to_string()))
    }

    async fn run_migrations(pool: &PgPool) -> Result<(), FactoryError> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(|error| FactoryError::Migration(error.to_string()))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use crate::domain::{ExternalId, TaskDraft};
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn test_create_in_memory_shares_one_store() {
        let factory = RepositoryFactory::new(StorageConfig::default());
        let repositories = factory.create().await.unwrap();
        let context = RequestContext::new();

        let user = repositories
            .user_repository
            .materialize(&context, &ExternalId::parse("alice").unwrap())
            .await
            .unwrap();
        repositories
            .task_repository
            .create(&context, &user.id, TaskDraft::new("A"))
            .await
            .unwrap();

        let tasks = repositories
            .task_repository
            .list(&context, &user.id)
            .await
            .unwrap();
        assert_eq!(tasks.len(), 1);
        repositories.close().await;
    }

    #[rstest]
    #[tokio::test]
    async fn test_create_postgres_without_url_fails() {
        let config = StorageConfig {
            mode: StorageMode::Postgres,
            database_url: None,
            ..StorageConfig::default()
        };

        let result = RepositoryFactory::new(config).create().await;

        assert!(matches!(
            result,
            Err(FactoryError::Configuration(
                ConfigurationError::MissingDatabaseUrl
            ))
        ));
    }
}
