//! Payment
//!
//! Reconciling a tendered amount against a cart total, quick-cash suggestions
//! and the keypad entry buffer used while a payment is being taken.

use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;

use crate::pricing::{MINOR_PER_MAJOR, PricingError, decimal_amount, money_from_decimal};

/// Fixed banknote amounts, in major units, offered as quick tenders.
const BANKNOTES: [i64; 4] = [50, 100, 200, 500];

/// Maximum number of quick tender suggestions.
const MAX_SUGGESTIONS: usize = 6;

/// Errors raised while taking a payment.
#[derive(Debug, Error, PartialEq)]
pub enum PaymentError {
    /// The tendered amount does not cover the total.
    #[error("insufficient payment: {shortfall} {currency} still due")]
    Insufficient {
        /// Amount still owed, in major units.
        shortfall: Decimal,

        /// Currency code of the sale.
        currency: &'static str,
    },

    /// A negative amount was tendered.
    #[error("tendered amount cannot be negative")]
    NegativeTender,

    /// Tendered currency differs from the sale currency (tendered, sale).
    #[error("tendered {0}, but the sale is in {1}")]
    CurrencyMismatch(&'static str, &'static str),

    /// The keypad buffer does not hold a number.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Wrapped pricing error.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Outcome of a successful reconciliation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Change<'a> {
    /// Amount due.
    pub total: Money<'a, Currency>,

    /// Amount handed over.
    pub tendered: Money<'a, Currency>,

    /// Change to give back, `tendered - total`.
    pub due: Money<'a, Currency>,
}

/// Compare `tendered` against `total`.
///
/// # Errors
///
/// - [`PaymentError::Insufficient`]: `tendered` is less than `total`; carries the shortfall.
/// - [`PaymentError::NegativeTender`]: `tendered` is negative.
/// - [`PaymentError::CurrencyMismatch`]: the two amounts are in different currencies.
pub fn reconcile<'a>(
    total: Money<'a, Currency>,
    tendered: Money<'a, Currency>,
) -> Result<Change<'a>, PaymentError> {
    let currency = total.currency();

    if tendered.currency() != currency {
        return Err(PaymentError::CurrencyMismatch(
            tendered.currency().iso_alpha_code,
            currency.iso_alpha_code,
        ));
    }

    if tendered.to_minor_units() < 0 {
        return Err(PaymentError::NegativeTender);
    }

    if tendered.to_minor_units() < total.to_minor_units() {
        let shortfall = Money::from_minor(
            total.to_minor_units() - tendered.to_minor_units(),
            currency,
        );

        return Err(PaymentError::Insufficient {
            shortfall: decimal_amount(&shortfall),
            currency: currency.iso_alpha_code,
        });
    }

    Ok(Change {
        total,
        tendered,
        due: tendered.sub(total).map_err(PricingError::from)?,
    })
}

/// Quick-cash amounts for `total`: the next whole unit, the next multiples of
/// ten and twenty, and common banknotes, ascending, at most six.
pub fn suggested_tenders<'a>(total: &Money<'a, Currency>) -> SmallVec<[Money<'a, Currency>; 6]> {
    let due = total.to_minor_units();

    let mut amounts: SmallVec<[i64; 8]> = [1, 10, 20]
        .into_iter()
        .filter_map(|step| round_up(due, step * MINOR_PER_MAJOR))
        .chain(BANKNOTES.iter().map(|note| note * MINOR_PER_MAJOR))
        .filter(|amount| *amount >= due)
        .collect();

    amounts.sort_unstable();
    amounts.dedup();

    amounts
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|minor| Money::from_minor(minor, total.currency()))
        .collect()
}

fn round_up(value: i64, step: i64) -> Option<i64> {
    let remainder = value.checked_rem_euclid(step)?;

    if remainder == 0 {
        Some(value)
    } else {
        value.checked_add(step - remainder)
    }
}

/// Keypad entry buffer for a tendered amount.
///
/// Starts at `"0"`; the first digit replaces the leading zero and only one
/// decimal point is accepted. After [`AmountEntry::set`], the next digit or
/// point starts a fresh entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountEntry {
    buffer: String,
    replace_next: bool,
}

impl AmountEntry {
    /// An empty entry reading `"0"`.
    pub fn new() -> Self {
        Self {
            buffer: String::from("0"),
            replace_next: false,
        }
    }

    /// Press a key. Returns `false` if the key was ignored.
    pub fn press(&mut self, key: char) -> bool {
        if self.replace_next && (key.is_ascii_digit() || key == '.') {
            self.clear();
        }

        match key {
            '0'..='9' if self.buffer == "0" => {
                self.buffer.clear();
                self.buffer.push(key);
                true
            }
            '0'..='9' => {
                self.buffer.push(key);
                true
            }
            '.' if !self.buffer.contains('.') => {
                self.buffer.push('.');
                true
            }
            _ => false,
        }
    }

    /// Remove the last key pressed.
    pub fn backspace(&mut self) {
        self.replace_next = false;
        self.buffer.pop();

        if self.buffer.is_empty() {
            self.buffer.push('0');
        }
    }

    /// Reset to `"0"`.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Replace the entry with an exact amount.
    pub fn set(&mut self, amount: Decimal) {
        self.buffer = amount.to_string();
        self.replace_next = true;
    }

    /// The entry as typed.
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// The entry as a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidAmount`] if the buffer does not parse.
    pub fn value(&self) -> Result<Decimal, PaymentError> {
        self.buffer
            .trim_end_matches('.')
            .parse::<Decimal>()
            .map_err(|_err| PaymentError::InvalidAmount(self.buffer.clone()))
    }

    /// The entry as money in `currency`.
    ///
    /// # Errors
    ///
    /// Returns a [`PaymentError`] if the buffer does not parse or is out of range.
    pub fn money<'a>(&self, currency: &'a Currency) -> Result<Money<'a, Currency>, PaymentError> {
        Ok(money_from_decimal(self.value()?, currency)?)
    }
}

impl Default for AmountEntry {
    fn default() -> Self {
        Self::new()
    }
}

/// A payment in progress: what the customer has handed over so far.
///
/// Exists only between opening a payment and finalizing or cancelling it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentAttempt {
    entry: AmountEntry,
}

impl PaymentAttempt {
    /// A new attempt with nothing tendered.
    pub fn new() -> Self {
        Self::default()
    }

    /// The keypad entry.
    pub fn entry(&self) -> &AmountEntry {
        &self.entry
    }

    /// The keypad entry, mutably.
    pub fn entry_mut(&mut self) -> &mut AmountEntry {
        &mut self.entry
    }

    /// Record a tendered amount, replacing the keypad entry.
    pub fn tender(&mut self, amount: Decimal) {
        self.entry.set(amount);
    }

    /// The tendered amount in `currency`.
    ///
    /// # Errors
    ///
    /// Returns a [`PaymentError`] if the entry is not a valid amount.
    pub fn tendered<'a>(&self, currency: &'a Currency) -> Result<Money<'a, Currency>, PaymentError> {
        self.entry.money(currency)
    }
}
