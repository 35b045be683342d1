//! Fixed-point stock quantity with one decimal place.
//!
//! Loose goods sold by weight may carry a fractional part, but nothing finer
//! than 0.1 of a unit. Quantities are stored as integer tenths.

use std::ops::{Add, Sub};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors raised when constructing a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    /// The value has more than one decimal place.
    #[error("Quantity {0} is finer than one decimal place; only multiples of 0.1 are allowed")]
    InvalidGranularity(Decimal),

    /// The value does not fit in the supported range.
    #[error("Quantity {0} is out of range")]
    OutOfRange(Decimal),
}

/// A stock quantity in tenths of a unit.
///
/// Serializes as a decimal number of units, so 15 tenths travel as `"1.5"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(i64);

impl Quantity {
    /// Zero units.
    pub const ZERO: Self = Self(0);

    /// Number of tenths in one unit.
    pub const TENTHS_PER_UNIT: i64 = 10;

    /// Creates a quantity from integer tenths.
    #[must_use]
    pub const fn from_tenths(tenths: i64) -> Self {
        Self(tenths)
    }

    /// Creates a quantity of whole units.
    #[must_use]
    pub const fn units(units: i64) -> Self {
        Self(units * Self::TENTHS_PER_UNIT)
    }

    /// Parses a decimal quantity, rejecting anything finer than 0.1.
    pub fn from_decimal(value: Decimal) -> Result<Self, QuantityError> {
        let normalized = value.normalize();
        if normalized.scale() > 1 {
            return Err(QuantityError::InvalidGranularity(value));
        }
        normalized
            .checked_mul(Decimal::TEN)
            .and_then(|tenths| tenths.to_i64())
            .map(Self)
            .ok_or(QuantityError::OutOfRange(value))
    }

    /// Returns the quantity in tenths.
    #[must_use]
    pub const fn tenths(self) -> i64 {
        self.0
    }

    /// Returns the quantity as a decimal number of units.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 1).normalize()
    }

    /// Returns true if the quantity is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns true if the quantity is strictly positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns the smaller of two quantities.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    /// Subtracts, clamping at zero.
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        let v = self.0 - other.0;
        if v < 0 { Self(0) } else { Self(v) }
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.to_decimal(), serializer)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::from_decimal(value).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(1.5), 15)]
    #[case(dec!(2), 20)]
    #[case(dec!(0.1), 1)]
    #[case(dec!(3.50), 35)]
    #[case(dec!(0), 0)]
    fn test_from_decimal_accepts_tenths(#[case] input: Decimal, #[case] tenths: i64) {
        assert_eq!(Quantity::from_decimal(input).unwrap().tenths(), tenths);
    }

    #[rstest]
    #[case(dec!(1.25))]
    #[case(dec!(0.05))]
    #[case(dec!(2.001))]
    fn test_from_decimal_rejects_finer_granularity(#[case] input: Decimal) {
        assert_eq!(
            Quantity::from_decimal(input),
            Err(QuantityError::InvalidGranularity(input))
        );
    }

    #[test]
    fn test_from_decimal_overflow_is_out_of_range() {
        assert_eq!(
            Quantity::from_decimal(Decimal::MAX),
            Err(QuantityError::OutOfRange(Decimal::MAX))
        );
        assert!(matches!(
            Quantity::from_decimal(Decimal::MIN),
            Err(QuantityError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_serde_uses_units() {
        let json = serde_json::to_string(&Quantity::from_tenths(15)).unwrap();
        assert_eq!(json, r#""1.5""#);
        assert_eq!(
            serde_json::to_string(&Quantity::units(2)).unwrap(),
            r#""2""#
        );

        let parsed: Quantity = serde_json::from_str(r#""2.5""#).unwrap();
        assert_eq!(parsed, Quantity::from_tenths(25));
        assert!(serde_json::from_str::<Quantity>(r#""0.25""#).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Quantity::from_tenths(15).to_string(), "1.5");
        assert_eq!(Quantity::units(3).to_string(), "3");
    }

    #[test]
    fn test_saturating_sub() {
        assert_eq!(
            Quantity::units(1).saturating_sub(Quantity::units(2)),
            Quantity::ZERO
        );
        assert_eq!(
            Quantity::units(2).saturating_sub(Quantity::from_tenths(5)),
            Quantity::from_tenths(15)
        );
    }
}
