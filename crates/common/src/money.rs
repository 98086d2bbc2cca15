//! Monetary amounts and discount rates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a new Money amount from a dollar value.
    pub fn from_dollars(dollars: i64) -> Self {
        Self {
            cents: dollars * 100,
        }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity, or `None` on overflow.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    /// Adds two amounts, or `None` on overflow.
    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.cents.checked_add(rhs.cents).map(Money::from_cents)
    }

    /// Subtracts `rhs`, or `None` on overflow.
    pub fn checked_sub(&self, rhs: Money) -> Option<Money> {
        self.cents.checked_sub(rhs.cents).map(Money::from_cents)
    }

    /// Sums amounts, or `None` if the sum overflows.
    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

/// Returned when a discount fraction falls outside `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid discount rate: {0} (must be between 0 and 1)")]
pub struct InvalidDiscountRate(pub f64);

/// A discount expressed as a fraction of the unit price.
///
/// Stored in basis points (1/100 of a percent) so that applying it to an
/// amount in cents stays in integer arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// No discount.
    pub const ZERO: DiscountRate = DiscountRate(0);

    /// The whole price.
    pub const FULL: DiscountRate = DiscountRate(10_000);

    /// Creates a rate from a fraction such as `0.10` for ten percent.
    pub fn from_fraction(fraction: f64) -> Result<Self, InvalidDiscountRate> {
        if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
            return Err(InvalidDiscountRate(fraction));
        }
        Ok(Self((fraction * 10_000.0).round() as u32))
    }

    /// Creates a rate from basis points (`1000` = 10%).
    pub fn from_basis_points(bps: u32) -> Result<Self, InvalidDiscountRate> {
        if bps > Self::FULL.0 {
            return Err(InvalidDiscountRate(f64::from(bps) / 10_000.0));
        }
        Ok(Self(bps))
    }

    /// Returns the rate in basis points.
    pub fn basis_points(&self) -> u32 {
        self.0
    }

    /// Returns true if this rate takes nothing off the price.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns the discount amount for `amount`, rounded half away from zero
    /// to the nearest cent.
    pub fn discount_on(&self, amount: Money) -> Money {
        let scaled = i128::from(amount.cents()) * i128::from(self.0);
        let rounded = if scaled >= 0 {
            (scaled + 5_000) / 10_000
        } else {
            (scaled - 5_000) / 10_000
        };
        Money::from_cents(rounded as i64)
    }
}

impl std::fmt::Display for DiscountRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_cents() {
        let money = Money::from_cents(1234);
        assert_eq!(money.cents(), 1234);
        assert_eq!(money.dollars(), 12);
        assert_eq!(money.cents_part(), 34);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "$12.34");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!(a.checked_add(b), Some(Money::from_cents(1500)));
        assert_eq!(a.checked_sub(b), Some(Money::from_cents(500)));
        assert_eq!(a.checked_multiply(3), Some(Money::from_cents(3000)));
        assert_eq!(Money::checked_sum([a, b, b]), Some(Money::from_cents(2000)));
        assert_eq!(Money::checked_sum(std::iter::empty()), Some(Money::zero()));
    }

    #[test]
    fn test_money_arithmetic_overflow() {
        let half = Money::from_cents(i64::MAX / 2);

        assert_eq!(half.checked_multiply(3), None);
        assert_eq!(half.checked_add(half).and_then(|m| m.checked_add(half)), None);
        assert_eq!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)), None);
        assert_eq!(Money::checked_sum([half, half, half]), None);
    }

    #[test]
    fn test_discount_rate_from_fraction() {
        let rate = DiscountRate::from_fraction(0.10).unwrap();
        assert_eq!(rate.basis_points(), 1000);
        assert_eq!(rate.to_string(), "10.00%");

        assert_eq!(DiscountRate::from_fraction(0.0).unwrap(), DiscountRate::ZERO);
        assert_eq!(DiscountRate::from_fraction(1.0).unwrap(), DiscountRate::FULL);
    }

    #[test]
    fn test_discount_rate_rejects_out_of_range() {
        assert!(DiscountRate::from_fraction(-0.01).is_err());
        assert!(DiscountRate::from_fraction(1.5).is_err());
        assert!(DiscountRate::from_fraction(f64::NAN).is_err());
        assert!(DiscountRate::from_basis_points(10_001).is_err());
    }

    #[test]
    fn test_discount_on_amount() {
        let rate = DiscountRate::from_fraction(0.10).unwrap();
        assert_eq!(rate.discount_on(Money::from_dollars(100)), Money::from_dollars(10));

        // 12.5% of $0.99 is 12.375 cents
        let rate = DiscountRate::from_basis_points(1250).unwrap();
        assert_eq!(rate.discount_on(Money::from_cents(99)).cents(), 12);

        assert!(DiscountRate::ZERO.discount_on(Money::from_cents(999)).is_zero());
    }
}
