//! Transaction completion and bounded conflict retry.

use std::future::Future;

use store::Transaction;

use crate::error::OrderError;

/// Number of times an operation runs before a conflict is surfaced.
pub const MAX_ATTEMPTS: u32 = 2;

/// Commits `tx` if `result` is a success, rolls it back otherwise.
///
/// A failed rollback is logged and the operation's error is returned; the
/// database discards the transaction anyway once the connection drops it.
pub async fn finish<Tx, T>(tx: Tx, result: Result<T, OrderError>) -> Result<T, OrderError>
where
    Tx: Transaction,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, "rollback failed");
            }
            Err(e)
        }
    }
}

/// Runs `attempt` and reruns it once if it fails with a serialization
/// conflict. A second conflict becomes `ConflictRetryExhausted`. Business
/// errors are returned as they are.
pub async fn with_conflict_retry<T, F, Fut>(
    operation: &'static str,
    mut attempt: F,
) -> Result<T, OrderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OrderError>>,
{
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt().await {
            Err(e) if e.is_retryable() => {
                if tries >= MAX_ATTEMPTS {
                    tracing::warn!(operation, error = %e, "conflict persisted after retry");
                    return Err(OrderError::ConflictRetryExhausted(e.to_string()));
                }
                tracing::warn!(operation, error = %e, "transaction conflicted, retrying");
                metrics::counter!("orders_conflict_retries_total", "operation" => operation)
                    .increment(1);
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use store::StoreError;

    use super::*;

    fn conflict() -> OrderError {
        OrderError::from(StoreError::Conflict("could not serialize access".to_string()))
    }

    #[tokio::test]
    async fn retries_a_conflict_once() {
        let calls = Cell::new(0);
        let result = with_conflict_retry("test", || {
            calls.set(calls.get() + 1);
            let outcome = if calls.get() == 1 { Err(conflict()) } else { Ok(7) };
            async move { outcome }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn second_conflict_is_surfaced() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_conflict_retry("test", || {
            calls.set(calls.get() + 1);
            async { Err(conflict()) }
        })
        .await;

        assert!(matches!(result, Err(OrderError::ConflictRetryExhausted(_))));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn business_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_conflict_retry("test", || {
            calls.set(calls.get() + 1);
            async { Err(OrderError::Validation("quantity must be positive".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(OrderError::Validation(_))));
        assert_eq!(calls.get(), 1);
    }
}
