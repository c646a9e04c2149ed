//! Pricing
//!
//! All amounts are held in minor units (pence/cents). Weighted subtotals are
//! rounded half away from zero to the nearest minor unit.

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

use crate::{lines::LineItem, quantity::Quantity};

/// Minor units per major unit for every supported currency.
pub const MINOR_PER_MAJOR: i64 = 100;

/// Decimal places of a minor unit.
pub const MINOR_SCALE: u32 = 2;

/// Errors that can occur while calculating prices and totals.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// The amount does not fit in minor units.
    #[error("amount {0} is out of range")]
    OutOfRange(Decimal),

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Price of `quantity` at `unit_price`.
///
/// # Errors
///
/// Returns [`PricingError::OutOfRange`] if the subtotal overflows.
pub fn line_subtotal<'a>(
    unit_price: &Money<'a, Currency>,
    quantity: &Quantity,
) -> Result<Money<'a, Currency>, PricingError> {
    let unit_minor = unit_price.to_minor_units();

    let minor = match *quantity {
        Quantity::Units(count) => unit_minor
            .checked_mul(i64::from(count))
            .ok_or_else(|| PricingError::OutOfRange(Decimal::from(count)))?,
        Quantity::Weight(kg) => {
            let exact = Decimal::from(unit_minor)
                .checked_mul(kg)
                .ok_or(PricingError::OutOfRange(kg))?;

            exact
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
                .ok_or(PricingError::OutOfRange(exact))?
        }
    };

    Ok(Money::from_minor(minor, unit_price.currency()))
}

/// Calculates the total price of a list of lines
///
/// An empty list totals zero in `currency`.
///
/// # Errors
///
/// - [`PricingError::Money`]: Wrapped money arithmetic or currency mismatch error.
pub fn total_price<'a>(
    lines: &[LineItem<'a>],
    currency: &'a Currency,
) -> Result<Money<'a, Currency>, PricingError> {
    let total = lines
        .iter()
        .try_fold(Money::from_minor(0, currency), |acc, line| {
            acc.add(*line.subtotal())
        })?;

    Ok(total)
}

/// Convert a decimal amount in major units to money, rounding to the minor unit.
///
/// # Errors
///
/// Returns [`PricingError::OutOfRange`] if the amount does not fit in minor units.
pub fn money_from_decimal(
    amount: Decimal,
    currency: &Currency,
) -> Result<Money<'_, Currency>, PricingError> {
    let minor = amount
        .checked_mul(Decimal::from(MINOR_PER_MAJOR))
        .and_then(|value| {
            value
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
        })
        .ok_or(PricingError::OutOfRange(amount))?;

    Ok(Money::from_minor(minor, currency))
}

/// Amount of money in major units.
pub fn decimal_amount(money: &Money<'_, Currency>) -> Decimal {
    Decimal::new(money.to_minor_units(), MINOR_SCALE)
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{MXN, USD};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn unit_subtotal_multiplies_price() -> TestResult {
        let price = Money::from_minor(2550, MXN);

        let subtotal = line_subtotal(&price, &Quantity::units(3)?)?;

        assert_eq!(subtotal, Money::from_minor(7650, MXN));

        Ok(())
    }

    #[test]
    fn weight_subtotal_is_price_times_kilograms() -> TestResult {
        let price = Money::from_minor(1800, MXN);

        let subtotal = line_subtotal(&price, &Quantity::weight(Decimal::new(15, 1))?)?;

        assert_eq!(subtotal, Money::from_minor(2700, MXN));

        Ok(())
    }

    #[test]
    fn weight_subtotal_rounds_half_away_from_zero() -> TestResult {
        // 0.125 kg at 1.00 = 12.5 minor units
        let price = Money::from_minor(100, USD);

        let subtotal = line_subtotal(&price, &Quantity::weight(Decimal::new(125, 3))?)?;

        assert_eq!(subtotal.to_minor_units(), 13);

        Ok(())
    }

    #[test]
    fn unit_subtotal_overflow_is_reported() {
        let price = Money::from_minor(i64::MAX, USD);

        let result = line_subtotal(&price, &Quantity::Units(2));

        assert!(matches!(result, Err(PricingError::OutOfRange(_))));
    }

    #[test]
    fn money_from_decimal_rounds_to_minor_units() -> TestResult {
        assert_eq!(
            money_from_decimal(Decimal::new(2000, 2), USD)?,
            Money::from_minor(2000, USD)
        );

        assert_eq!(
            money_from_decimal(Decimal::new(10005, 4), USD)?.to_minor_units(),
            100
        );

        Ok(())
    }

    #[test]
    fn decimal_amount_reads_major_units() {
        assert_eq!(
            decimal_amount(&Money::from_minor(1501, USD)),
            Decimal::new(1501, 2)
        );
    }
}
