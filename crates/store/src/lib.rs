//! Transactional persistence for the order engine.
//!
//! The engine talks to storage only through the capability traits in
//! [`store`]: a [`Store`] hands out [`Transaction`]s, and each transaction
//! can read the catalog, adjust inventory, and read or write orders and
//! payments. Two backends are provided: [`InMemoryStore`] for tests and
//! [`PostgresStore`] for production.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryTransaction};
pub use model::{
    Discount, Order, OrderItem, Payment, PaymentStatus, Product, ProductPricing,
    CASH_PAYMENT_NAME,
};
pub use postgres::{PostgresStore, PostgresTransaction};
pub use store::{CatalogReader, InventoryAdjuster, OrderStore, PaymentStore, Store, Transaction};
