//! The user's open order and its total.

use common::{Money, UserId};
use store::{Order, OrderStore};

use crate::error::OrderError;

/// Returns the user's unpaid order, creating an empty one with a fresh
/// unpaid payment if none exists.
///
/// The user lock taken first makes concurrent first additions for the same
/// user wait for each other, so only one of them creates the order.
pub async fn find_or_create_open_order<T>(tx: &mut T, user_id: UserId) -> Result<Order, OrderError>
where
    T: OrderStore,
{
    tx.lock_user(user_id).await?;

    if let Some(order) = tx.find_open_order(user_id).await? {
        return Ok(order);
    }

    let order = Order::open(user_id);
    tx.insert_order(&order).await?;
    tracing::info!(order_id = %order.id, %user_id, "opened new order");

    Ok(order)
}

/// Sums the prices of the order's current line items.
pub fn recompute_total(order: &Order) -> Result<Money, OrderError> {
    order.items_total().ok_or_else(|| total_out_of_range(order))
}

pub(crate) fn total_out_of_range(order: &Order) -> OrderError {
    OrderError::Validation(format!("total of order {} is out of range", order.id))
}

/// Checks the stored total against the line items after a mutation.
pub(crate) fn check_total(order: &Order) {
    match order.items_total() {
        Some(expected) if expected == order.total => {}
        expected => tracing::warn!(
            order_id = %order.id,
            total = %order.total,
            ?expected,
            "order total drifted from its line items"
        ),
    }
}

#[cfg(test)]
mod tests {
    use store::{InMemoryStore, Store, Transaction};

    use super::*;

    #[tokio::test]
    async fn creates_once_then_reuses() {
        let store = InMemoryStore::new();
        let user_id = UserId::new();

        let mut tx = store.begin().await.unwrap();
        let first = find_or_create_open_order(&mut tx, user_id).await.unwrap();
        let second = find_or_create_open_order(&mut tx, user_id).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(first.total.is_zero());
        assert!(!first.is_paid());
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn different_users_get_different_orders() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let a = find_or_create_open_order(&mut tx, UserId::new()).await.unwrap();
        let b = find_or_create_open_order(&mut tx, UserId::new()).await.unwrap();

        assert_ne!(a.id, b.id);
    }
}
