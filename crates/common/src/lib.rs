//! Shared identifiers and value types for the order engine.

mod money;
mod types;

pub use money::{DiscountRate, InvalidDiscountRate, Money};
pub use types::{CategoryId, DiscountId, OrderId, OrderItemId, PaymentId, ProductId, UserId};
