//! Fixed-point money arithmetic for prices and order totals.
//!
//! Prices multiplied by quantities accumulate rounding error under binary
//! floating point, so the checkout core works in `rust_decimal::Decimal`
//! end to end. `Money` is a thin transparent wrapper that keeps decimal
//! arithmetic exact and additionally rejects negative amounts at the seams
//! where the domain constructs prices.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A non-negative decimal amount in the store currency.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Construct a price-like amount; negative values are rejected.
    pub fn new(amount: Decimal) -> Result<Self, DomainError> {
        if amount.is_sign_negative() {
            return Err(DomainError::validation("amount cannot be negative"));
        }
        Ok(Self(amount))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Exact `price * quantity` (no rounding).
    pub fn times(&self, quantity: i64) -> Money {
        Money(self.0 * Decimal::from(quantity))
    }

    pub fn plus(&self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc.plus(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rejects_negative_amounts() {
        assert!(Money::new(dec!(-0.01)).is_err());
        assert!(Money::new(dec!(0)).is_ok());
    }

    #[test]
    fn times_is_exact_decimal_arithmetic() {
        let price = Money::new(dec!(19.99)).unwrap();
        assert_eq!(price.times(3).amount(), dec!(59.97));
    }

    #[test]
    fn sum_over_lines_has_no_drift() {
        // 0.10 summed ten times must be exactly 1.00 (fails under f64).
        let dime = Money::new(dec!(0.10)).unwrap();
        let total: Money = std::iter::repeat(dime).take(10).sum();
        assert_eq!(total.amount(), dec!(1.00));
    }
}
