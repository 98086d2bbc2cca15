//! Open orders, line item mutations and payment settlement.

mod aggregate;
mod commands;
mod protocol;
mod service;
mod settlement;
mod state;

pub use aggregate::{find_or_create_open_order, recompute_total};
pub use commands::{AddItem, ConfirmPayment, MAX_ITEM_QUANTITY, RemoveItem, UpdateItem};
pub use protocol::{add_item, update_item};
pub use service::OrderService;
pub use settlement::confirm_payment;
pub use state::OrderState;
