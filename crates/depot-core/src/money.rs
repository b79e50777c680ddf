//! # Money Module
//!
//! Integer-cent money for order totals, payments and balances.
//!
//! Documents store every amount as `…Cents` integers. Legacy documents wrote
//! floating point amounts (`"unitPrice": 12.5`); those are converted exactly
//! once by the migration pass through [`Money::from_legacy_amount`] and never
//! touched as floats again.
//!
//! ```rust
//! use depot_core::money::Money;
//!
//! let unit = Money::from_cents(1250);
//! let line = unit * 4;
//! assert_eq!(line.cents(), 5000);
//! assert_eq!(line.to_string(), "50.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

/// A monetary value in the smallest currency unit.
///
/// Signed so that balances can go negative when an order is overpaid.
/// Arithmetic saturates at the `i64` bounds rather than panicking.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a legacy floating point amount (major units) to cents.
    ///
    /// Rounds half away from zero. Non-finite input becomes zero.
    ///
    /// ```rust
    /// use depot_core::money::Money;
    ///
    /// assert_eq!(Money::from_legacy_amount(19.99).cents(), 1999);
    /// assert_eq!(Money::from_legacy_amount(-4.5).cents(), -450);
    /// ```
    pub fn from_legacy_amount(amount: f64) -> Self {
        if !amount.is_finite() {
            return Money::zero();
        }
        Money((amount * 100.0).round() as i64)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Line total for `quantity` units at this unit price.
    ///
    /// Saturates instead of overflowing. Order totals are checked against
    /// `MAX_AMOUNT_CENTS` in validation, so a saturated total is rejected
    /// before it is written.
    #[inline]
    pub const fn times(&self, quantity: i64) -> Self {
        Money(self.0.saturating_mul(quantity))
    }
}

/// Plain `major.minor` rendering; currency symbols are the SPA's concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(self.0.saturating_neg())
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.times(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_legacy_amount_conversion() {
        assert_eq!(Money::from_legacy_amount(12.5).cents(), 1250);
        assert_eq!(Money::from_legacy_amount(0.1 + 0.2).cents(), 30);
        assert_eq!(Money::from_legacy_amount(-3.333).cents(), -333);
        assert_eq!(Money::from_legacy_amount(f64::NAN).cents(), 0);
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(250);
        assert_eq!((a + b).cents(), 1250);
        assert_eq!((a - b).cents(), 750);
        assert_eq!((b * 3).cents(), 750);
        assert_eq!((-b).cents(), -250);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.cents(), 1500);
    }

    #[test]
    fn test_times_saturates() {
        let huge = Money::from_cents(i64::MAX / 2);
        assert_eq!(huge.times(4).cents(), i64::MAX);
    }

    #[test]
    fn test_addition_saturates() {
        let line = Money::from_cents(i64::MAX / 2).times(3);
        let total: Money = [line, line].iter().sum();
        assert_eq!(total.cents(), i64::MAX);
        assert_eq!((Money::from_cents(i64::MIN) - Money::from_cents(1)).cents(), i64::MIN);
        assert_eq!((-Money::from_cents(i64::MIN)).cents(), i64::MAX);
    }
}
