//! Rows the order engine reads and writes.

use chrono::{DateTime, Utc};
use common::{
    CategoryId, DiscountId, DiscountRate, Money, OrderId, OrderItemId, PaymentId, ProductId,
    UserId,
};
use serde::{Deserialize, Serialize};

/// Name given to a payment before the payer settles it.
pub const CASH_PAYMENT_NAME: &str = "CASH";

/// A catalog product together with its live stock count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    /// Units available for reservation. Only the inventory adjuster changes it.
    pub quantity: u32,
    pub category_id: CategoryId,
    pub discount_id: Option<DiscountId>,
}

/// A catalog discount, referenced by products and never mutated by orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub id: DiscountId,
    pub name: String,
    pub rate: DiscountRate,
    pub active: bool,
}

/// The unit economics of a product at the moment it is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductPricing {
    pub unit_price: Money,
    pub discount: DiscountRate,
    pub available_quantity: u32,
}

/// Settlement status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

impl PaymentStatus {
    /// Returns the status as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "UNPAID",
            PaymentStatus::Paid => "PAID",
        }
    }

    /// Parses a stored status.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UNPAID" => Some(PaymentStatus::Unpaid),
            "PAID" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The payment owned by exactly one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub name: String,
    pub amount: Money,
    pub status: PaymentStatus,
}

impl Payment {
    /// Creates the placeholder payment attached to a fresh order.
    pub fn unpaid() -> Self {
        Self {
            id: PaymentId::new(),
            name: CASH_PAYMENT_NAME.to_string(),
            amount: Money::zero(),
            status: PaymentStatus::Unpaid,
        }
    }
}

/// A line item: one product in one order.
///
/// `price` is the charge computed when the quantity was last changed and is
/// not recomputed if the catalog price moves afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Money,
}

/// An order with its line items and payment loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total: Money,
    pub payment: Payment,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates an empty open order with a fresh unpaid payment.
    pub fn open(user_id: UserId) -> Self {
        Self {
            id: OrderId::new(),
            user_id,
            items: Vec::new(),
            total: Money::zero(),
            payment: Payment::unpaid(),
            created_at: Utc::now(),
        }
    }

    /// Returns true once the payment has been settled.
    pub fn is_paid(&self) -> bool {
        self.payment.status == PaymentStatus::Paid
    }

    /// Returns the line item for a product, if present.
    pub fn item_for_product(&self, product_id: ProductId) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    /// Returns a line item by id, if present.
    pub fn item(&self, item_id: OrderItemId) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    /// Sums the current line prices, or `None` if the sum overflows.
    pub fn items_total(&self) -> Option<Money> {
        Money::checked_sum(self.items.iter().map(|item| item.price))
    }
}
