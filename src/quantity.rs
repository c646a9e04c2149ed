//! Quantities
//!
//! A line's quantity is either a whole number of units or a measured weight in
//! kilograms, matching the product's [`PricingUnit`](crate::products::PricingUnit).

use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors for quantities that cannot be placed on a line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuantityError {
    /// Zero unit count.
    #[error("quantity must be at least one unit")]
    ZeroUnits,

    /// Zero or negative weight.
    #[error("invalid weight {0} kg; weight must be positive")]
    NonPositiveWeight(Decimal),

    /// A weight was given for a product sold by the unit.
    #[error("product is sold by the unit, not by weight")]
    UnitsExpected,

    /// A unit count was given for a product sold by weight.
    #[error("product is sold by weight, not by the unit")]
    WeightExpected,

    /// The resulting unit count does not fit.
    #[error("quantity is too large")]
    Overflow,
}

/// Quantity on a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    /// Whole units.
    Units(u32),

    /// Weight in kilograms.
    Weight(Decimal),
}

impl Quantity {
    /// A unit count.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::ZeroUnits`] if `count` is zero.
    pub fn units(count: u32) -> Result<Self, QuantityError> {
        Self::Units(count).validated()
    }

    /// A weight in kilograms.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::NonPositiveWeight`] if `kilograms` is zero or negative.
    pub fn weight(kilograms: Decimal) -> Result<Self, QuantityError> {
        Self::Weight(kilograms).validated()
    }

    /// Check that the quantity is positive.
    ///
    /// # Errors
    ///
    /// Returns a [`QuantityError`] for zero units or a non-positive weight.
    pub fn validated(self) -> Result<Self, QuantityError> {
        match self {
            Self::Units(0) => Err(QuantityError::ZeroUnits),
            Self::Weight(kg) if kg <= Decimal::ZERO => Err(QuantityError::NonPositiveWeight(kg)),
            _ => Ok(self),
        }
    }

    /// Whether this is a measured weight.
    pub fn is_weight(&self) -> bool {
        matches!(self, Self::Weight(_))
    }

    /// The quantity as a decimal number of units or kilograms.
    pub fn as_decimal(&self) -> Decimal {
        match *self {
            Self::Units(count) => Decimal::from(count),
            Self::Weight(kg) => kg,
        }
    }

    /// Stack more units onto a unit count.
    pub(crate) fn stacked(self, other: Self) -> Result<Self, QuantityError> {
        match (self, other) {
            (Self::Units(a), Self::Units(b)) => a
                .checked_add(b)
                .map(Self::Units)
                .ok_or(QuantityError::Overflow),
            _ => Err(QuantityError::UnitsExpected),
        }
    }

    /// Apply a signed delta to a unit count.
    ///
    /// Returns `Ok(None)` when the result drops to zero or below.
    pub(crate) fn adjusted(self, delta: i64) -> Result<Option<Self>, QuantityError> {
        let Self::Units(count) = self else {
            return Err(QuantityError::UnitsExpected);
        };

        let next = i64::from(count)
            .checked_add(delta)
            .ok_or(QuantityError::Overflow)?;

        if next <= 0 {
            return Ok(None);
        }

        u32::try_from(next)
            .map(|count| Some(Self::Units(count)))
            .map_err(|_err| QuantityError::Overflow)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Units(count) => write!(f, "{count}"),
            Self::Weight(kg) => write!(f, "{kg:.3} kg"),
        }
    }
}
