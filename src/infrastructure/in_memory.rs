//! In-memory repository implementations.
//!
//! Both repositories share one [`InMemoryStore`]. A transaction works on a
//! private copy of the store taken under the write lock and publishes it only
//! on success, which gives the same commit, rollback and cancellation
//! contract as the `PostgreSQL` backend.
//!
//! # Features
//!
//! - Thread-safe with `Arc<RwLock<...>>`
//! - Copy-on-write transactions, discarded on error or cancellation
//! - Checked `i32` task id allocation

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::context::RequestContext;
use crate::domain::{ExternalId, Task, TaskDraft, TaskId, User, UserId};
use crate::infrastructure::{RepositoryError, TaskRepository, UserRepository};

// =============================================================================
// In-Memory Store
// =============================================================================

#[derive(Debug, Clone, Default)]
struct StoreState {
    users: HashMap<ExternalId, User>,
    tasks: BTreeMap<TaskId, Task>,
    last_task_id: i32,
}

impl StoreState {
    fn next_task_id(&mut self) -> Result<TaskId, RepositoryError> {
        let next = self
            .last_task_id
            .checked_add(1)
            .ok_or(RepositoryError::IdExhausted)?;
        self.last_task_id = next;
        Ok(TaskId::new(next))
    }

    fn owned_task_mut(&mut self, id: TaskId, owner_id: &UserId) -> Option<&mut Task> {
        self.tasks
            .get_mut(&id)
            .filter(|task| task.is_owned_by(owner_id))
    }
}

/// Shared state behind the in-memory repositories.
///
/// Cloning is cheap and every clone refers to the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `work` against a private copy of the store and publishes the copy
    /// only if `work` succeeds and `context` is still active.
    async fn transact<T, F>(&self, context: &RequestContext, work: F) -> Result<T, RepositoryError>
    where
        T: Send,
        F: FnOnce(&mut StoreState) -> Result<T, RepositoryError> + Send,
    {
        context.ensure_active()?;

        let mut guard = self.state.write().await;
        let mut working_copy = guard.clone();
        let value = work(&mut working_copy)?;

        context.ensure_active()?;
        *guard = working_copy;
        Ok(value)
    }

    /// Runs a read-only `work` against a consistent snapshot.
    async fn read<T, F>(&self, context: &RequestContext, work: F) -> Result<T, RepositoryError>
    where
        T: Send,
        F: FnOnce(&StoreState) -> T + Send,
    {
        context.ensure_active()?;

        let guard = self.state.read().await;
        let value = work(&guard);

        context.ensure_active()?;
        Ok(value)
    }
}

// =============================================================================
// In-Memory Task Repository
// =============================================================================

/// In-memory implementation of `TaskRepository`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    store: InMemoryStore,
}

impl InMemoryTaskRepository {
    /// Creates a repository backed by a fresh store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository backed by an existing store.
    #[must_use]
    pub const fn with_store(store: InMemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(
        &self,
        context: &RequestContext,
        owner_id: &UserId,
        draft: TaskDraft,
    ) -> Result<Task, RepositoryError> {
        self.store
            .transact(context, |state| {
                let id = state.next_task_id()?;
                let task = Task::create(id, *owner_id, draft, Utc::now());
                state.tasks.insert(id, task.clone());
                Ok(task)
            })
            .await
    }

    async fn get(
        &self,
        context: &RequestContext,
        id: TaskId,
        owner_id: &UserId,
    ) -> Result<Option<Task>, RepositoryError> {
        self.store
            .read(context, |state| {
                state
                    .tasks
                    .get(&id)
                    .filter(|task| task.is_owned_by(owner_id))
                    .cloned()
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
        self.store
            .transact(context, |state| {
                let task = state
                    .owned_task_mut(id, owner_id)
                    .ok_or(RepositoryError::NotFoundOrNotOwned)?;
                *task = task.clone().revise(draft, Utc::now());
                Ok(task.clone())
            })
            .await
    }

    async fn delete(
        &self,
        context: &RequestContext,
        id: TaskId,
        owner_id: &UserId,
    ) -> Result<(), RepositoryError> {
        self.store
            .transact(context, |state| {
                state
                    .owned_task_mut(id, owner_id)
                    .ok_or(RepositoryError::NotFoundOrNotOwned)?;
                state.tasks.remove(&id);
                Ok(())
            })
            .await
    }

    async fn list(
        &self,
        context: &RequestContext,
        owner_id: &UserId,
    ) -> Result<Vec<Task>, RepositoryError> {
        self.store
            .read(context, |state| {
                state
                    .tasks
                    .values()
                    .filter(|task| task.is_owned_by(owner_id))
                    .cloned()
                    .collect()
            })
            .await
    }
}

// =============================================================================
// In-Memory User Repository
// =============================================================================

/// In-memory implementation of `UserRepository`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    store: InMemoryStore,
}

impl InMemoryUserRepository {
    /// Creates a repository backed by a fresh store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository backed by an existing store.
    #[must_use]
    pub const fn with_store(store: InMemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_external_id(
        &self,
        context: &RequestContext,
        external_id: &ExternalId,
    ) -> Result<Option<User>, RepositoryError> {
        self.store
            .read(context, |state| state.users.get(external_id).cloned())
            .await
    }

    async fn materialize(
        &self,
        context: &RequestContext,
        external_id: &ExternalId,
    ) -> Result<User, RepositoryError> {
        self.store
            .transact(context, |state| {
                let user = state
                    .users
                    .entry(external_id.clone())
                    .or_insert_with(|| User::new(UserId::generate(), external_id.clone()));
                Ok(user.clone())
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
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> InMemoryStore {
        InMemoryStore::new()
    }

    fn external(value: &str) -> ExternalId {
        ExternalId::parse(value).unwrap()
    }

    async fn materialized(store: &InMemoryStore, subject: &str) -> UserId {
        InMemoryUserRepository::with_store(store.clone())
            .materialize(&RequestContext::new(), &external(subject))
            .await
            .unwrap()
            .id
    }

    // -------------------------------------------------------------------------
    // Task Repository Tests
    // -------------------------------------------------------------------------

    #[rstest]
    #[tokio::test]
    async fn test_create_then_get_returns_draft(store: InMemoryStore) {
        let context = RequestContext::new();
        let repository = InMemoryTaskRepository::with_store(store.clone());
        let owner = materialized(&store, "alice").await;
        let draft = TaskDraft {
            description: "details".to_string(),
            ..TaskDraft::new("A")
        };

        let created = repository.create(&context, &owner, draft.clone()).await.unwrap();
        let fetched = repository.get(&context, created.id, &owner).await.unwrap();

        assert_eq!(fetched.as_ref().map(Task::draft), Some(draft));
        assert_eq!(fetched.map(|task| task.owner_id), Some(owner));
    }

    #[rstest]
    #[tokio::test]
    async fn test_ids_are_monotonic(store: InMemoryStore) {
        let context = RequestContext::new();
        let repository = InMemoryTaskRepository::with_store(store.clone());
        let owner = materialized(&store, "alice").await;

        let first = repository.create(&context, &owner, TaskDraft::new("A")).await.unwrap();
        let second = repository.create(&context, &owner, TaskDraft::new("B")).await.unwrap();

        assert!(second.id > first.id);
    }

    #[rstest]
    #[tokio::test]
    async fn test_non_owner_sees_absence_everywhere(store: InMemoryStore) {
        let context = RequestContext::new();
        let repository = InMemoryTaskRepository::with_store(store.clone());
        let alice = materialized(&store, "alice").await;
        let bob = materialized(&store, "bob").await;
        let task = repository.create(&context, &alice, TaskDraft::new("A")).await.unwrap();

        assert_eq!(repository.get(&context, task.id, &bob).await.unwrap(), None);
        assert_eq!(
            repository
                .update(&context, task.id, &bob, TaskDraft::new("hijacked"))
                .await,
            Err(RepositoryError::NotFoundOrNotOwned)
        );
        assert_eq!(
            repository.delete(&context, task.id, &bob).await,
            Err(RepositoryError::NotFoundOrNotOwned)
        );
        assert!(repository.list(&context, &bob).await.unwrap().is_empty());

        let unchanged = repository.get(&context, task.id, &alice).await.unwrap();
        assert_eq!(unchanged, Some(task));
    }

    #[rstest]
    #[tokio::test]
    async fn test_update_refreshes_updated_at(store: InMemoryStore) {
        let context = RequestContext::new();
        let repository = InMemoryTaskRepository::with_store(store.clone());
        let owner = materialized(&store, "alice").await;
        let task = repository.create(&context, &owner, TaskDraft::new("A")).await.unwrap();

        let draft = TaskDraft {
            completed: true,
            ..TaskDraft::new("B")
        };
        let updated = repository
            .update(&context, task.id, &owner, draft.clone())
            .await
            .unwrap();

        assert_eq!(updated.draft(), draft);
        assert_eq!(updated.created_at, task.created_at);
        assert!(updated.updated_at >= task.updated_at);
    }

    #[rstest]
    #[tokio::test]
    async fn test_delete_then_get_is_absent(store: InMemoryStore) {
        let context = RequestContext::new();
        let repository = InMemoryTaskRepository::with_store(store.clone());
        let owner = materialized(&store, "alice").await;
        let task = repository.create(&context, &owner, TaskDraft::new("A")).await.unwrap();

        repository.delete(&context, task.id, &owner).await.unwrap();

        assert_eq!(repository.get(&context, task.id, &owner).await.unwrap(), None);
        assert_eq!(
            repository.delete(&context, task.id, &owner).await,
            Err(RepositoryError::NotFoundOrNotOwned)
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_list_is_ordered_by_id_and_scoped(store: InMemoryStore) {
        let context = RequestContext::new();
        let repository = InMemoryTaskRepository::with_store(store.clone());
        let alice = materialized(&store, "alice").await;
        let bob = materialized(&store, "bob").await;

        for title in ["A", "B", "C"] {
            repository.create(&context, &alice, TaskDraft::new(title)).await.unwrap();
            repository.create(&context, &bob, TaskDraft::new(title)).await.unwrap();
        }

        let tasks = repository.list(&context, &alice).await.unwrap();
        let ids: Vec<TaskId> = tasks.iter().map(|task| task.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();

        assert_eq!(tasks.len(), 3);
        assert_eq!(ids, sorted);
        assert!(tasks.iter().all(|task| task.is_owned_by(&alice)));
    }

    #[rstest]
    #[tokio::test]
    async fn test_id_exhaustion_is_a_fault(store: InMemoryStore) {
        let context = RequestContext::new();
        let repository = InMemoryTaskRepository::with_store(store.clone());
        let owner = materialized(&store, "alice").await;
        store.state.write().await.last_task_id = i32::MAX;

        let result = repository.create(&context, &owner, TaskDraft::new("A")).await;

        assert_eq!(result, Err(RepositoryError::IdExhausted));
        assert!(repository.list(&context, &owner).await.unwrap().is_empty());
    }

    // -------------------------------------------------------------------------
    // Transaction Tests
    // -------------------------------------------------------------------------

    #[rstest]
    #[tokio::test]
    async fn test_failed_transaction_discards_writes(store: InMemoryStore) {
        let context = RequestContext::new();
        let owner = UserId::generate();

        let result: Result<(), RepositoryError> = store
            .transact(&context, |state| {
                let id = state.next_task_id()?;
                state
                    .tasks
                    .insert(id, Task::create(id, owner, TaskDraft::new("A"), Utc::now()));
                Err(RepositoryError::database("test", "boom"))
            })
            .await;

        assert!(result.is_err());
        let state = store.state.read().await;
        assert!(state.tasks.is_empty());
        assert_eq!(state.last_task_id, 0);
    }

    #[rstest]
    #[tokio::test]
    async fn test_cancellation_mid_transaction_never_commits(store: InMemoryStore) {
        let context = RequestContext::new();
        let owner = UserId::generate();

        let result = store
            .transact(&context, |state| {
                let id = state.next_task_id()?;
                state
                    .tasks
                    .insert(id, Task::create(id, owner, TaskDraft::new("A"), Utc::now()));
                context.cancel();
                Ok(id)
            })
            .await;

        assert_eq!(result, Err(RepositoryError::Cancelled));
        assert!(store.state.read().await.tasks.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn test_cancelled_context_is_rejected_up_front(store: InMemoryStore) {
        let context = RequestContext::new();
        context.cancel();
        let repository = InMemoryTaskRepository::with_store(store.clone());

        let result = repository
            .create(&context, &UserId::generate(), TaskDraft::new("A"))
            .await;

        assert_eq!(result, Err(RepositoryError::Cancelled));
    }

    // -------------------------------------------------------------------------
    // User Repository Tests
    // -------------------------------------------------------------------------

    #[rstest]
    #[tokio::test]
    async fn test_materialize_is_idempotent(store: InMemoryStore) {
        let context = RequestContext::new();
        let repository = InMemoryUserRepository::with_store(store.clone());

        let first = repository.materialize(&context, &external("X")).await.unwrap();
        let second = repository.materialize(&context, &external("X")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.state.read().await.users.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn test_concurrent_materialize_yields_one_user(store: InMemoryStore) {
        let repository = InMemoryUserRepository::with_store(store.clone());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repository = repository.clone();
                tokio::spawn(async move {
                    repository
                        .materialize(&RequestContext::new(), &external("X"))
                        .await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }

        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.state.read().await.users.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn test_find_by_external_id(store: InMemoryStore) {
        let context = RequestContext::new();
        let repository = InMemoryUserRepository::with_store(store);
        let user = repository.materialize(&context, &external("X")).await.unwrap();

        assert_eq!(
            repository
                .find_by_external_id(&context, &external("X"))
                .await
                .unwrap(),
            Some(user)
        );
        assert_eq!(
            repository
                .find_by_external_id(&context, &external("Y"))
                .await
                .unwrap(),
            None
        );
    }
}
