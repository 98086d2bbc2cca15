//! Line item pricing.

use common::{DiscountRate, Money};

use crate::error::OrderError;

/// Computes the charge for a line item:
/// `quantity * (unit_price - unit_price * discount)`.
///
/// The discount is taken off a single unit, rounded to the cent, before
/// multiplying, so every unit in a line costs the same. A charge that does
/// not fit in `i64` cents is rejected as a validation error.
pub fn line_total(
    unit_price: Money,
    discount: DiscountRate,
    quantity: u32,
) -> Result<Money, OrderError> {
    unit_price
        .checked_sub(discount.discount_on(unit_price))
        .and_then(|net_unit_price| net_unit_price.checked_multiply(quantity))
        .ok_or_else(|| {
            OrderError::Validation(format!(
                "line total of {quantity} x {unit_price} is out of range"
            ))
        })
}
