//! Integer minor-unit money type.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! `Cents` has no conversion to or from `f32`/`f64`. Fractional values only
//! enter through [`Cents::from_decimal_bankers`], which rounds half to even.

use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by money arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// The result does not fit in 64-bit cents.
    #[error("Amount overflows the supported range")]
    Overflow,

    /// A decimal value could not be represented as whole cents.
    #[error("Amount {0} cannot be represented in cents")]
    OutOfRange(Decimal),
}

/// A signed amount in integer minor currency units (cents).
///
/// Positive amounts are debits and negative amounts are credits when used on
/// a journal line.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    /// Zero cents.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from a raw number of cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw number of cents.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns true if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Returns true if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns the absolute amount, saturating at `i64::MAX`.
    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    /// Adds two amounts, returning `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Subtracts two amounts, returning `None` on overflow.
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Negates the amount, returning `None` for `i64::MIN`.
    #[must_use]
    pub const fn checked_neg(self) -> Option<Self> {
        match self.0.checked_neg() {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Sums amounts, failing instead of wrapping on overflow.
    pub fn checked_sum<I>(amounts: I) -> Result<Self, MoneyError>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, a| acc.checked_add(a).ok_or(MoneyError::Overflow))
    }

    /// Rounds a decimal number of cents to whole cents using banker's rounding
    /// (round half to even).
    pub fn from_decimal_bankers(cents: Decimal) -> Result<Self, MoneyError> {
        cents
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
            .to_i64()
            .map(Self)
            .ok_or(MoneyError::OutOfRange(cents))
    }

    /// Returns the amount as a decimal number of cents.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::from(self.0)
    }
}

impl From<i64> for Cents {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}

impl From<Cents> for i64 {
    fn from(cents: Cents) -> Self {
        cents.0
    }
}

impl Add for Cents {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Cents {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Cents {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Cents {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Cents {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl std::fmt::Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cents_arithmetic() {
        let a = Cents::new(9700);
        let b = Cents::new(-100);
        assert_eq!(a + b, Cents::new(9600));
        assert_eq!(a - b, Cents::new(9800));
        assert_eq!(-a, Cents::new(-9700));
        assert_eq!(vec![a, b, -a].into_iter().sum::<Cents>(), b);
    }

    #[test]
    fn test_checked_sum_overflow() {
        let result = Cents::checked_sum([Cents::new(i64::MAX), Cents::new(1)]);
        assert_eq!(result, Err(MoneyError::Overflow));

        let result = Cents::checked_sum([Cents::new(i64::MAX), Cents::new(-1), Cents::new(1)]);
        assert_eq!(result, Ok(Cents::new(i64::MAX)));
    }

    #[test]
    fn test_checked_neg_min() {
        assert_eq!(Cents::new(i64::MIN).checked_neg(), None);
        assert_eq!(Cents::new(5).checked_neg(), Some(Cents::new(-5)));
    }

    #[rstest]
    #[case(dec!(200.0), 200)]
    #[case(dec!(2.5), 2)]
    #[case(dec!(3.5), 4)]
    #[case(dec!(-2.5), -2)]
    #[case(dec!(10.49), 10)]
    #[case(dec!(10.51), 11)]
    fn test_from_decimal_bankers(#[case] input: Decimal, #[case] expected: i64) {
        assert_eq!(Cents::from_decimal_bankers(input).unwrap(), Cents::new(expected));
    }

    #[test]
    fn test_serde_is_plain_integer() {
        let json = serde_json::to_string(&Cents::new(9700)).unwrap();
        assert_eq!(json, "9700");
        let parsed: Cents = serde_json::from_str("-5000").unwrap();
        assert_eq!(parsed, Cents::new(-5000));
    }

    #[test]
    fn test_serde_rejects_fractional_json() {
        assert!(serde_json::from_str::<Cents>("97.5").is_err());
    }
}
