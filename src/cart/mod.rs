//! Cart
//!
//! The cart ledger: an ordered list of lines with a running total that always
//! equals the sum of the line subtotals. Every mutation either completes or
//! leaves the cart untouched.

use rusty_money::{Money, iso::Currency};
use slotmap::SlotMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    lines::{LineItem, LineKey},
    payment::{Change, PaymentAttempt, PaymentError, reconcile},
    pricing::PricingError,
    products::{Product, ProductCode},
    quantity::{Quantity, QuantityError},
};

/// Errors related to cart mutations.
#[derive(Debug, Error, PartialEq)]
pub enum CartError {
    /// The quantity cannot be placed on a line.
    #[error(transparent)]
    Quantity(#[from] QuantityError),

    /// Quantity adjustments are not allowed on weighed lines.
    #[error("line {0:?} is sold by weight; remove it and weigh again")]
    WeightedLine(LineKey),

    /// The line is not in the cart.
    #[error("line {0:?} not found")]
    LineNotFound(LineKey),

    /// A product's currency differs from the cart currency (code, product currency, cart currency).
    #[error("product {0} has currency {1}, but cart has currency {2}")]
    CurrencyMismatch(ProductCode, &'static str, &'static str),

    /// There is nothing to pay for.
    #[error("cart total is zero; nothing to pay")]
    NothingToPay,

    /// Wrapped pricing error.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Result of adjusting a line's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineUpdate {
    /// The line is still present with this quantity.
    Updated(Quantity),

    /// The quantity dropped to zero or below and the line was removed from this position.
    Removed(usize),
}

/// Cart
#[derive(Debug, Clone)]
pub struct Cart<'a> {
    lines: Vec<LineItem<'a>>,
    keys: SlotMap<LineKey, ()>,
    total: Money<'a, Currency>,
    payment: Option<PaymentAttempt>,
    currency: &'a Currency,
}

impl<'a> Cart<'a> {
    /// Create a new empty cart.
    pub fn new(currency: &'a Currency) -> Self {
        Cart {
            lines: Vec::new(),
            keys: SlotMap::with_key(),
            total: Money::from_minor(0, currency),
            payment: None,
            currency,
        }
    }

    /// Add `quantity` of `product`.
    ///
    /// A product sold by the unit stacks onto its existing line; a weighed
    /// product always starts a new line. Returns the key of the line touched.
    ///
    /// # Errors
    ///
    /// - [`CartError::Quantity`]: the quantity is not positive, or its kind
    ///   (units or weight) does not match the product.
    /// - [`CartError::CurrencyMismatch`]: the product is priced in another currency.
    /// - [`CartError::Pricing`]: the subtotal or total overflowed.
    pub fn add_item(
        &mut self,
        product: &Product<'a>,
        quantity: Quantity,
    ) -> Result<LineKey, CartError> {
        let quantity = quantity.validated()?;

        match (product.is_weighted(), quantity.is_weight()) {
            (true, false) => return Err(QuantityError::WeightExpected.into()),
            (false, true) => return Err(QuantityError::UnitsExpected.into()),
            _ => {}
        }

        let product_currency = product.price.currency();

        if product_currency != self.currency {
            return Err(CartError::CurrencyMismatch(
                product.code.clone(),
                product_currency.iso_alpha_code,
                self.currency.iso_alpha_code,
            ));
        }

        let existing = if product.is_weighted() {
            None
        } else {
            self.lines
                .iter()
                .position(|line| line.code() == &product.code)
        };

        if let Some(idx) = existing
            && let Some(line) = self.lines.get(idx)
        {
            let updated = line.with_quantity(line.quantity().stacked(quantity)?)?;
            let key = updated.key();

            self.replace_line(idx, updated)?;

            debug!(code = %product.code, quantity = %quantity, "stacked onto cart line");

            return Ok(key);
        }

        let key = self.keys.insert(());

        let line = match LineItem::new(key, product, quantity) {
            Ok(line) => line,
            Err(err) => {
                self.keys.remove(key);
                return Err(err.into());
            }
        };

        let total = match self.total.add(*line.subtotal()) {
            Ok(total) => total,
            Err(err) => {
                self.keys.remove(key);
                return Err(PricingError::from(err).into());
            }
        };

        self.lines.push(line);
        self.total = total;

        debug!(code = %product.code, quantity = %quantity, "added cart line");

        Ok(key)
    }

    /// Adjust a unit-priced line's quantity by `delta`.
    ///
    /// A result of zero or below removes the line.
    ///
    /// # Errors
    ///
    /// - [`CartError::LineNotFound`]: no line has this key.
    /// - [`CartError::WeightedLine`]: the line holds a weighed product; the cart is unchanged.
    /// - [`CartError::Quantity`]: the new quantity overflows.
    pub fn update_quantity(&mut self, line: LineKey, delta: i64) -> Result<LineUpdate, CartError> {
        let idx = self.position(line).ok_or(CartError::LineNotFound(line))?;
        let current = self.lines.get(idx).ok_or(CartError::LineNotFound(line))?;

        if current.is_weighted() {
            warn!(line = ?line, "refused quantity adjustment on weighed line");

            return Err(CartError::WeightedLine(line));
        }

        match current.quantity().adjusted(delta)? {
            Some(quantity) => {
                let updated = current.with_quantity(quantity)?;

                self.replace_line(idx, updated)?;

                debug!(line = ?line, delta, quantity = %quantity, "adjusted cart line");

                Ok(LineUpdate::Updated(quantity))
            }
            None => {
                self.remove_at(idx)?;

                debug!(line = ?line, delta, "adjusted cart line to zero; removed");

                Ok(LineUpdate::Removed(idx))
            }
        }
    }

    /// Remove a line regardless of its quantity, returning it with its former position.
    ///
    /// Removing the last line also drops any open payment attempt.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if no line has this key.
    pub fn remove_item(&mut self, line: LineKey) -> Result<(usize, LineItem<'a>), CartError> {
        let idx = self.position(line).ok_or(CartError::LineNotFound(line))?;
        let removed = self.remove_at(idx)?;

        debug!(line = ?line, code = %removed.code(), "removed cart line");

        Ok((idx, removed))
    }

    /// Sum of all line subtotals.
    pub fn total(&self) -> Money<'a, Currency> {
        self.total
    }

    /// Compare a tendered amount against the total. Does not change the cart.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Insufficient`] with the shortfall if `tendered`
    /// is below the total, or another [`PaymentError`] for negative or foreign tenders.
    pub fn reconcile_payment(
        &self,
        tendered: Money<'a, Currency>,
    ) -> Result<Change<'a>, PaymentError> {
        reconcile(self.total, tendered)
    }

    /// Open a payment attempt, or return the one already open.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NothingToPay`] if the cart is empty or totals zero.
    pub fn begin_payment(&mut self) -> Result<&mut PaymentAttempt, CartError> {
        if self.is_empty() || self.total.to_minor_units() == 0 {
            return Err(CartError::NothingToPay);
        }

        Ok(self.payment.get_or_insert_with(PaymentAttempt::new))
    }

    /// The open payment attempt, if any.
    pub fn payment(&self) -> Option<&PaymentAttempt> {
        self.payment.as_ref()
    }

    /// The open payment attempt, mutably.
    pub fn payment_mut(&mut self) -> Option<&mut PaymentAttempt> {
        self.payment.as_mut()
    }

    /// Discard the open payment attempt, leaving the lines in place.
    pub fn cancel_payment(&mut self) -> Option<PaymentAttempt> {
        self.payment.take()
    }

    /// Commit the sale: drop every line, reset the total and discard any
    /// payment attempt. Finalizing an empty cart does nothing.
    pub fn finalize(&mut self) {
        if self.is_empty() && self.payment.is_none() {
            return;
        }

        debug!(lines = self.lines.len(), total = %self.total, "finalized cart");

        self.lines.clear();
        self.keys.clear();
        self.payment = None;
        self.total = Money::from_minor(0, self.currency);
    }

    /// Get a line from the cart.
    ///
    /// # Errors
    ///
    /// Returns a `CartError::LineNotFound` if the line is not found.
    pub fn get_line(&self, line: LineKey) -> Result<&LineItem<'a>, CartError> {
        self.lines
            .iter()
            .find(|item| item.key() == line)
            .ok_or(CartError::LineNotFound(line))
    }

    /// Line at a position, in insertion order.
    pub fn line_at(&self, idx: usize) -> Option<&LineItem<'a>> {
        self.lines.get(idx)
    }

    /// Position of a line, in insertion order.
    pub fn position(&self, line: LineKey) -> Option<usize> {
        self.lines.iter().position(|item| item.key() == line)
    }

    /// The lines, in insertion order.
    pub fn lines(&self) -> &[LineItem<'a>] {
        &self.lines
    }

    /// Iterate over the lines in the cart.
    pub fn iter(&self) -> impl Iterator<Item = &LineItem<'a>> {
        self.lines.iter()
    }

    /// Get the number of lines in the cart.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Get the currency of the cart.
    pub fn currency(&self) -> &'a Currency {
        self.currency
    }

    fn replace_line(&mut self, idx: usize, updated: LineItem<'a>) -> Result<(), CartError> {
        let slot = self
            .lines
            .get_mut(idx)
            .ok_or(CartError::LineNotFound(updated.key()))?;

        let total = self
            .total
            .sub(*slot.subtotal())
            .and_then(|total| total.add(*updated.subtotal()))
            .map_err(PricingError::from)?;

        *slot = updated;
        self.total = total;

        Ok(())
    }

    fn remove_at(&mut self, idx: usize) -> Result<LineItem<'a>, CartError> {
        let line = self
            .lines
            .get(idx)
            .ok_or(CartError::LineNotFound(LineKey::default()))?;

        let total = self
            .total
            .sub(*line.subtotal())
            .map_err(PricingError::from)?;

        let removed = self.lines.remove(idx);

        self.keys.remove(removed.key());
        self.total = total;

        if self.lines.is_empty() && self.payment.take().is_some() {
            debug!("cart emptied; dropped open payment");
        }

        Ok(removed)
    }
}
