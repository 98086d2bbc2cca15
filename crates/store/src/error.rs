use thiserror::Error;

use common::ProductId;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A conditional stock decrement found too few units.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The transaction lost a race with a concurrent one and may be retried.
    #[error("Serialization conflict: {0}")]
    Conflict(String),

    /// A stored value violates an invariant the engine relies on.
    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true if the whole transaction may be retried.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// SQLSTATE codes Postgres raises when a transaction lost a race.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            match db_err.code().as_deref() {
                Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => {
                    return StoreError::Conflict(db_err.message().to_string());
                }
                // Two transactions raced to insert the same line item.
                Some(UNIQUE_VIOLATION) if db_err.constraint() == Some("unique_order_product") => {
                    return StoreError::Conflict(db_err.message().to_string());
                }
                _ => {}
            }
        }
        StoreError::Database(e)
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
