//! Infrastructure module for storage.
//!
//! Repository traits, the scoped transaction helper, and the `PostgreSQL`
//! and in-memory backends selected at startup by the factory.

pub mod factory;
pub mod in_memory;
pub mod postgres;
pub mod repository;
pub mod transaction;

pub use factory::{FactoryError, Repositories, RepositoryFactory};
pub use in_memory::{InMemoryStore, InMemoryTaskRepository, InMemoryUserRepository};
pub use postgres::{PostgresTaskRepository, PostgresUserRepository};
pub use repository::{RepositoryError, TaskRepository, UserRepository};
pub use transaction::run_in_transaction;
