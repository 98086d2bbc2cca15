//! Payment settlement.

use store::{Order, PaymentStatus, PaymentStore};

use super::commands::ConfirmPayment;
use super::state::OrderState;
use crate::error::OrderError;

/// Marks the order's payment as paid if the submitted amount covers the
/// total. Settlement is terminal.
pub async fn confirm_payment<T>(tx: &mut T, cmd: &ConfirmPayment) -> Result<Order, OrderError>
where
    T: PaymentStore,
{
    let mut order = tx.get_order_by_payment(cmd.payment_id).await?;

    // Someone else's payment is reported as absent.
    if order.user_id != cmd.user_id {
        return Err(OrderError::not_found("Payment", cmd.payment_id));
    }
    if OrderState::of(&order).is_terminal() {
        return Err(OrderError::OrderAlreadyPaid { order_id: order.id });
    }
    if cmd.amount < order.total {
        return Err(OrderError::InsufficientPayment {
            submitted: cmd.amount,
            total: order.total,
        });
    }

    tx.settle_payment(cmd.payment_id, cmd.amount, &cmd.payer_name)
        .await?;

    order.payment.amount = cmd.amount;
    order.payment.name = cmd.payer_name.clone();
    order.payment.status = PaymentStatus::Paid;

    Ok(order)
}
