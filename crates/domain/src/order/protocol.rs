//! Line item mutations.
//!
//! Each function performs one mutation against an open transaction. The
//! caller commits on success and rolls back on any error, so a failure
//! after a stock reservation never leaves the reservation behind.

use common::OrderItemId;
use store::{CatalogReader, InventoryAdjuster, Order, OrderItem, OrderStore};

use super::aggregate::{
    check_total, find_or_create_open_order, recompute_total, total_out_of_range,
};
use super::commands::{AddItem, UpdateItem};
use super::state::OrderState;
use crate::error::OrderError;
use crate::pricing::line_total;

/// Adds a product to the user's open order, creating the order if needed.
///
/// Reserves the stock, prices the line from the current catalog, inserts it
/// and stores the recomputed order total.
pub async fn add_item<T>(tx: &mut T, cmd: &AddItem) -> Result<Order, OrderError>
where
    T: CatalogReader + InventoryAdjuster + OrderStore,
{
    let mut order = find_or_create_open_order(tx, cmd.user_id).await?;

    if order.item_for_product(cmd.product_id).is_some() {
        return Err(OrderError::DuplicateItem {
            product_id: cmd.product_id,
        });
    }

    tx.reserve(cmd.product_id, cmd.quantity).await?;
    let pricing = tx.get_product_pricing(cmd.product_id).await?;

    let item = OrderItem {
        id: OrderItemId::new(),
        order_id: order.id,
        product_id: cmd.product_id,
        quantity: cmd.quantity,
        price: line_total(pricing.unit_price, pricing.discount, cmd.quantity)?,
    };
    tx.insert_item(&item).await?;
    order.items.push(item);

    order.total = recompute_total(&order)?;
    tx.update_total(order.id, order.total).await?;
    check_total(&order);

    Ok(order)
}

/// Changes the quantity of a line item in the user's unpaid order.
///
/// Growing a line reserves the extra units, shrinking it releases them, and
/// zero deletes the line and releases everything it held. The order total
/// moves by the change in line price.
pub async fn update_item<T>(tx: &mut T, cmd: &UpdateItem) -> Result<Order, OrderError>
where
    T: CatalogReader + InventoryAdjuster + OrderStore,
{
    let mut order = tx.get_order_by_item(cmd.item_id).await?;

    // Someone else's line item is reported as absent.
    if order.user_id != cmd.user_id {
        return Err(OrderError::not_found("Order item", cmd.item_id));
    }
    if !OrderState::of(&order).can_modify_items() {
        return Err(OrderError::OrderAlreadyPaid { order_id: order.id });
    }

    let index = order
        .items
        .iter()
        .position(|item| item.id == cmd.item_id)
        .ok_or_else(|| OrderError::not_found("Order item", cmd.item_id))?;
    let previous = order.items[index].clone();

    if cmd.new_quantity == previous.quantity {
        return Err(OrderError::NoChange {
            item_id: previous.id,
            quantity: previous.quantity,
        });
    }

    if cmd.new_quantity == 0 {
        tx.release(previous.product_id, previous.quantity).await?;
        tx.delete_item(previous.id).await?;
        order.items.remove(index);
        order.total = order
            .total
            .checked_sub(previous.price)
            .ok_or_else(|| total_out_of_range(&order))?;
    } else {
        if cmd.new_quantity > previous.quantity {
            tx.reserve(previous.product_id, cmd.new_quantity - previous.quantity)
                .await?;
        } else {
            tx.release(previous.product_id, previous.quantity - cmd.new_quantity)
                .await?;
        }

        let pricing = tx.get_product_pricing(previous.product_id).await?;
        let price = line_total(pricing.unit_price, pricing.discount, cmd.new_quantity)?;
        let total = price
            .checked_sub(previous.price)
            .and_then(|delta| order.total.checked_add(delta))
            .ok_or_else(|| total_out_of_range(&order))?;

        let item = &mut order.items[index];
        item.quantity = cmd.new_quantity;
        item.price = price;
        tx.update_item(item).await?;

        order.total = total;
    }

    tx.update_total(order.id, order.total).await?;
    check_total(&order);

    Ok(order)
}
