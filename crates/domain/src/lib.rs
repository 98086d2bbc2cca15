//! Order engine domain layer.
//!
//! This crate provides:
//! - the pricing calculator for discounted line items
//! - the order aggregate manager (find-or-create of the open order, totals)
//! - the order mutation protocol (add, update, remove line items)
//! - payment settlement
//! - `OrderService`, which runs each operation in one transaction with a
//!   single retry on serialization conflicts

pub mod error;
pub mod order;
pub mod pricing;
pub mod transaction;

pub use error::OrderError;
pub use order::{
    AddItem, ConfirmPayment, MAX_ITEM_QUANTITY, OrderService, OrderState, RemoveItem, UpdateItem,
};
pub use pricing::line_total;
