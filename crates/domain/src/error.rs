//! Domain error types.

use common::{Money, OrderId, OrderItemId, ProductId};
use store::StoreError;
use thiserror::Error;

/// Errors returned by order operations.
///
/// Every variant except `Store` is a business outcome meant to be shown to
/// the caller. `Store` wraps infrastructure failures.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Product, order, line item or payment absent.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The product already has a line item in the order.
    #[error("Item already in order: product {product_id}")]
    DuplicateItem { product_id: ProductId },

    /// Not enough stock to reserve the requested quantity.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The submitted amount does not cover the order total.
    #[error("Payment amount is not enough: submitted {submitted}, order total {total}")]
    InsufficientPayment { submitted: Money, total: Money },

    /// The order is settled and can no longer change.
    #[error("Order has already been paid: {order_id}")]
    OrderAlreadyPaid { order_id: OrderId },

    /// The requested quantity equals the current one.
    #[error("Nothing changed: item {item_id} already has quantity {quantity}")]
    NoChange { item_id: OrderItemId, quantity: u32 },

    /// Malformed input rejected before touching storage.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The transaction conflicted again after its one retry.
    #[error("Transaction conflict persisted after retry: {0}")]
    ConflictRetryExhausted(String),

    /// An unexpected storage failure.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl OrderError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        OrderError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true if the failed transaction may be retried as a whole.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrderError::Store(e) if e.is_conflict())
    }

    /// Returns a stable, machine-readable name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::NotFound { .. } => "not_found",
            OrderError::DuplicateItem { .. } => "duplicate_item",
            OrderError::InsufficientStock { .. } => "insufficient_stock",
            OrderError::InsufficientPayment { .. } => "insufficient_payment",
            OrderError::OrderAlreadyPaid { .. } => "order_already_paid",
            OrderError::NoChange { .. } => "no_change",
            OrderError::Validation(_) => "validation_error",
            OrderError::ConflictRetryExhausted(_) => "conflict_retry_exhausted",
            OrderError::Store(_) => "internal",
        }
    }
}

impl From<StoreError> for OrderError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => OrderError::NotFound { entity, id },
            StoreError::InsufficientStock {
                product_id,
                requested,
                available,
            } => OrderError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            other => OrderError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_store_errors_become_domain_kinds() {
        let err = OrderError::from(StoreError::NotFound {
            entity: "Product",
            id: "42".to_string(),
        });
        assert_eq!(err.kind(), "not_found");
        assert_eq!(err.to_string(), "Product not found: 42");

        let err = OrderError::from(StoreError::InsufficientStock {
            product_id: ProductId::new(),
            requested: 3,
            available: 1,
        });
        assert!(matches!(
            err,
            OrderError::InsufficientStock {
                requested: 3,
                available: 1,
                ..
            }
        ));
    }

    #[test]
    fn only_conflicts_are_retryable() {
        let conflict = OrderError::from(StoreError::Conflict("40001".to_string()));
        assert!(conflict.is_retryable());
        assert_eq!(conflict.kind(), "internal");

        let integrity = OrderError::from(StoreError::DataIntegrity("bad".to_string()));
        assert!(!integrity.is_retryable());

        assert!(!OrderError::Validation("quantity".to_string()).is_retryable());
    }
}
