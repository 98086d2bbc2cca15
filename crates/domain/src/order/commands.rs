//! Order commands.

use common::{Money, OrderItemId, PaymentId, ProductId, UserId};

use crate::error::OrderError;

/// Largest quantity a single line item may hold.
pub const MAX_ITEM_QUANTITY: u32 = i32::MAX as u32;

fn check_quantity_bound(quantity: u32) -> Result<(), OrderError> {
    if quantity > MAX_ITEM_QUANTITY {
        return Err(OrderError::Validation(format!(
            "quantity {quantity} exceeds the maximum of {MAX_ITEM_QUANTITY}"
        )));
    }
    Ok(())
}

/// Command to add a product to the user's open order.
#[derive(Debug, Clone)]
pub struct AddItem {
    /// The user whose open order receives the item.
    pub user_id: UserId,

    /// The product to add.
    pub product_id: ProductId,

    /// Units to reserve.
    pub quantity: u32,
}

impl AddItem {
    /// Creates a new AddItem command.
    pub fn new(user_id: UserId, product_id: ProductId, quantity: u32) -> Self {
        Self {
            user_id,
            product_id,
            quantity,
        }
    }

    /// Rejects malformed input before any storage access.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.quantity == 0 {
            return Err(OrderError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }
        check_quantity_bound(self.quantity)
    }
}

/// Command to change the quantity of a line item.
///
/// A quantity of zero removes the item.
#[derive(Debug, Clone)]
pub struct UpdateItem {
    /// The user who owns the order.
    pub user_id: UserId,

    /// The line item to change.
    pub item_id: OrderItemId,

    /// The quantity the line item should hold afterwards.
    pub new_quantity: u32,
}

impl UpdateItem {
    /// Creates a new UpdateItem command.
    pub fn new(user_id: UserId, item_id: OrderItemId, new_quantity: u32) -> Self {
        Self {
            user_id,
            item_id,
            new_quantity,
        }
    }

    /// Rejects malformed input before any storage access.
    pub fn validate(&self) -> Result<(), OrderError> {
        check_quantity_bound(self.new_quantity)
    }
}

/// Command to remove a line item from an order.
#[derive(Debug, Clone)]
pub struct RemoveItem {
    /// The user who owns the order.
    pub user_id: UserId,

    /// The line item to remove.
    pub item_id: OrderItemId,
}

impl RemoveItem {
    /// Creates a new RemoveItem command.
    pub fn new(user_id: UserId, item_id: OrderItemId) -> Self {
        Self { user_id, item_id }
    }
}

impl From<RemoveItem> for UpdateItem {
    fn from(cmd: RemoveItem) -> Self {
        UpdateItem::new(cmd.user_id, cmd.item_id, 0)
    }
}

/// Command to settle the payment of an order.
#[derive(Debug, Clone)]
pub struct ConfirmPayment {
    /// The user who owns the order.
    pub user_id: UserId,

    /// The payment to settle.
    pub payment_id: PaymentId,

    /// Amount submitted by the payer.
    pub amount: Money,

    /// Name recorded on the payment.
    pub payer_name: String,
}

impl ConfirmPayment {
    /// Creates a new ConfirmPayment command.
    pub fn new(
        user_id: UserId,
        payment_id: PaymentId,
        amount: Money,
        payer_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            payment_id,
            amount,
            payer_name: payer_name.into(),
        }
    }

    /// Rejects malformed input before any storage access.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.amount.is_negative() {
            return Err(OrderError::Validation(format!(
                "payment amount {} must not be negative",
                self.amount
            )));
        }
        if self.payer_name.trim().is_empty() {
            return Err(OrderError::Validation(
                "payer name is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_item_requires_positive_quantity() {
        let cmd = AddItem::new(UserId::new(), ProductId::new(), 0);
        assert!(matches!(cmd.validate(), Err(OrderError::Validation(_))));

        let cmd = AddItem::new(UserId::new(), ProductId::new(), 1);
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn quantities_are_bounded() {
        let cmd = AddItem::new(UserId::new(), ProductId::new(), MAX_ITEM_QUANTITY + 1);
        assert!(cmd.validate().is_err());

        let cmd = UpdateItem::new(UserId::new(), OrderItemId::new(), u32::MAX);
        assert!(cmd.validate().is_err());

        let cmd = UpdateItem::new(UserId::new(), OrderItemId::new(), 0);
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn remove_item_is_update_to_zero() {
        let user_id = UserId::new();
        let item_id = OrderItemId::new();
        let cmd: UpdateItem = RemoveItem::new(user_id, item_id).into();

        assert_eq!(cmd.user_id, user_id);
        assert_eq!(cmd.item_id, item_id);
        assert_eq!(cmd.new_quantity, 0);
    }

    #[test]
    fn confirm_payment_validation() {
        let payment_id = PaymentId::new();
        assert!(
            ConfirmPayment::new(UserId::new(), payment_id, Money::from_cents(100), "Jane")
                .validate()
                .is_ok()
        );
        assert!(
            ConfirmPayment::new(UserId::new(), payment_id, Money::from_cents(-1), "Jane")
                .validate()
                .is_err()
        );
        assert!(
            ConfirmPayment::new(UserId::new(), payment_id, Money::from_cents(100), "  ")
                .validate()
                .is_err()
        );
    }
}
