//! Order lifecycle state.

use serde::{Deserialize, Serialize};
use store::Order;

/// The state of an order, derived from its items and payment.
///
/// State transitions:
/// ```text
/// Empty ──► Open ──► Closed
///   ▲         │
///   └─────────┘ (last item removed)
/// ```
///
/// Settlement moves an order from `Empty` or `Open` to `Closed` inside a
/// single transaction; no intermediate state is ever stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderState {
    /// Unpaid, no line items.
    Empty,

    /// Unpaid, at least one line item.
    Open,

    /// Paid; read-only history (terminal state).
    Closed,
}

impl OrderState {
    /// Derives the state of an order.
    pub fn of(order: &Order) -> Self {
        if order.is_paid() {
            OrderState::Closed
        } else if order.items.is_empty() {
            OrderState::Empty
        } else {
            OrderState::Open
        }
    }

    /// Returns true if line items can be added, changed or removed.
    pub fn can_modify_items(&self) -> bool {
        matches!(self, OrderState::Empty | OrderState::Open)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Closed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Empty => "Empty",
            OrderState::Open => "Open",
            OrderState::Closed => "Closed",
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
