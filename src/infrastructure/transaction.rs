//! Scoped `PostgreSQL` transactions.
//!
//! [`run_in_transaction`] is the only place that begins, commits or rolls
//! back a transaction. Repository methods hand it a closure that receives
//! the transaction's connection.

use futures::future::BoxFuture;
use sqlx::{PgConnection, PgPool};

use super::RepositoryError;
use crate::context::RequestContext;

/// Runs `work` inside a transaction bound to `context`.
///
/// The transaction commits only when `work` succeeds and the context is still
/// active afterwards. Cancellation observed while `work` runs drops the
/// in-flight statement. Every failure path rolls back; a rollback failure is
/// logged and the original error is returned.
///
/// # Errors
///
/// Returns the closure's error, `RepositoryError::Cancelled`, or a
/// `RepositoryError::Database` for begin and commit failures.
pub async fn run_in_transaction<T, F>(
    pool: &PgPool,
    context: &RequestContext,
    operation: &'static str,
    work: F,
) -> Result<T, RepositoryError>
where
    T: Send,
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, RepositoryError>> + Send,
{
    context.ensure_active()?;

    let mut transaction = pool
        .begin()
        .await
        .map_err(|error| RepositoryError::database("begin transaction", error))?;

    let outcome = tokio::select! {
        biased;
        () = context.cancelled() => Err(RepositoryError::Cancelled),
        result = work(&mut *transaction) => result,
    };

    let outcome = outcome.and_then(|value| {
        context.ensure_active()?;
        Ok(value)
    });

    match outcome {
        Ok(value) => {
            transaction
                .commit()
                .await
                .map_err(|error| RepositoryError::database("commit", error))?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = transaction.rollback().await {
                tracing::error!(
                    %rollback_error,
                    operation,
                    original_error = %error,
                    "Transaction rollback failed"
                );
            }
            tracing::debug!(operation, %error, "Transaction rolled back");
            Err(error)
        }
    }
}
