//! Register session
//!
//! One operator's view of a sale in progress. The register owns the catalog
//! and the cart and routes every change through the cart's operations, while
//! tracking the row the operator has selected, a weighed product waiting for
//! its weight and the payment being taken.

use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    cart::{Cart, CartError, LineUpdate},
    catalog::{Catalog, CatalogError},
    checkout::{SaleConfirmation, SaleRequest, SaleSubmitter, SubmissionError},
    lines::{LineItem, LineKey},
    payment::{Change, PaymentAttempt, PaymentError, suggested_tenders},
    pricing::decimal_amount,
    products::{Product, ProductKey},
    quantity::{Quantity, QuantityError},
    receipt::Receipt,
};

/// Errors raised by register operations.
#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    /// Wrapped catalog lookup error.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Wrapped cart error.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Wrapped quantity validation error.
    #[error(transparent)]
    Quantity(#[from] QuantityError),

    /// Wrapped payment error.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// A weight was entered but no weighed product is waiting for one.
    #[error("no product is waiting for a weight")]
    NoPendingWeight,

    /// A row operation was requested with no row selected.
    #[error("no cart line is selected")]
    NoSelection,

    /// A tender was entered before payment was started.
    #[error("payment has not been started")]
    PaymentNotStarted,

    /// Payment was requested for an empty cart.
    #[error("cart is empty")]
    EmptyCart,
}

/// Errors raised while completing a sale.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// There is nothing to sell.
    #[error("cart is empty; nothing to check out")]
    EmptyCart,

    /// Checkout was requested before payment was started.
    #[error("payment has not been started")]
    PaymentNotStarted,

    /// The tender does not settle the sale.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// The sale could not be recorded; the cart is unchanged.
    #[error("sale could not be recorded: {0}")]
    Submission(#[from] SubmissionError),
}

/// What happened to a scanned code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The product was added to, or stacked onto, this line.
    Added(LineKey),

    /// The product is sold by weight and waits for [`Register::enter_weight`].
    WeightRequired(ProductKey),

    /// Nothing was scanned.
    Ignored,
}

/// A recorded sale.
#[derive(Debug, Clone)]
pub struct CompletedSale<'a> {
    /// Acknowledgement from the recorder.
    pub confirmation: SaleConfirmation,

    /// Total, tender and change.
    pub change: Change<'a>,

    /// Printable receipt.
    pub receipt: Receipt<'a>,
}

/// A register session.
#[derive(Debug)]
pub struct Register<'a> {
    catalog: Catalog<'a>,
    cart: Cart<'a>,
    selected: Option<usize>,
    pending_weight: Option<ProductKey>,
    location_id: u64,
    customer_id: Option<u64>,
}

impl<'a> Register<'a> {
    /// Open a register selling from `catalog` in `currency` at `location_id`.
    pub fn new(catalog: Catalog<'a>, currency: &'a Currency, location_id: u64) -> Self {
        Self {
            catalog,
            cart: Cart::new(currency),
            selected: None,
            pending_weight: None,
            location_id,
            customer_id: None,
        }
    }

    /// Attach a loyalty customer to the sale.
    #[must_use]
    pub fn with_customer(mut self, customer_id: u64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    /// Set or clear the loyalty customer.
    pub fn set_customer(&mut self, customer_id: Option<u64>) {
        self.customer_id = customer_id;
    }

    /// Scan a barcode or type a product name.
    ///
    /// Products sold by the unit are added with a quantity of one. Products
    /// sold by weight are held until [`Register::enter_weight`] or
    /// [`Register::cancel_weight`]. A blank query does nothing.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Catalog`]: no product matches.
    /// - [`SessionError::Cart`]: the product cannot be added.
    pub fn scan(&mut self, query: &str) -> Result<ScanOutcome, SessionError> {
        if query.trim().is_empty() {
            return Ok(ScanOutcome::Ignored);
        }

        let (key, product) = self.catalog.search(query).inspect_err(|err| {
            warn!(%query, %err, "scan did not match a product");
        })?;

        if product.is_weighted() {
            debug!(code = %product.code, "waiting for weight");

            self.pending_weight = Some(key);

            return Ok(ScanOutcome::WeightRequired(key));
        }

        let line = self.cart.add_item(product, Quantity::Units(1))?;

        self.pending_weight = None;
        self.selected = self.cart.position(line);

        Ok(ScanOutcome::Added(line))
    }

    /// Add the held weighed product with `kilograms`.
    ///
    /// The product stays held if the weight is rejected, so the operator can
    /// weigh again.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NoPendingWeight`]: no product is held.
    /// - [`SessionError::Quantity`]: the weight is zero or negative.
    /// - [`SessionError::Cart`]: the product cannot be added.
    pub fn enter_weight(&mut self, kilograms: Decimal) -> Result<LineKey, SessionError> {
        let product = self
            .pending_weight
            .and_then(|key| self.catalog.get(key))
            .ok_or(SessionError::NoPendingWeight)?;

        let quantity = Quantity::weight(kilograms)?;
        let line = self.cart.add_item(product, quantity)?;

        self.pending_weight = None;
        self.selected = self.cart.position(line);

        Ok(line)
    }

    /// Drop the held weighed product, if any.
    pub fn cancel_weight(&mut self) -> Option<&Product<'a>> {
        self.pending_weight
            .take()
            .and_then(|key| self.catalog.get(key))
    }

    /// The weighed product waiting for a weight.
    pub fn pending_weight(&self) -> Option<&Product<'a>> {
        self.pending_weight.and_then(|key| self.catalog.get(key))
    }

    /// Move the selection up one row, stopping at the first.
    pub fn select_previous(&mut self) -> Option<usize> {
        self.selected = match self.selected {
            _ if self.cart.is_empty() => None,
            Some(idx) => Some(idx.saturating_sub(1)),
            None => Some(0),
        };

        self.selected
    }

    /// Move the selection down one row, stopping at the last.
    pub fn select_next(&mut self) -> Option<usize> {
        let last = self.cart.len().checked_sub(1);

        self.selected = match (self.selected, last) {
            (_, None) => None,
            (Some(idx), Some(last)) => Some(idx.saturating_add(1).min(last)),
            (None, Some(_)) => Some(0),
        };

        self.selected
    }

    /// Select a row by position.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoSelection`] if there is no row at `idx`.
    pub fn select(&mut self, idx: usize) -> Result<&LineItem<'a>, SessionError> {
        let line = self.cart.line_at(idx).ok_or(SessionError::NoSelection)?;

        self.selected = Some(idx);

        Ok(line)
    }

    /// Position of the selected row.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// The selected row.
    pub fn selected_line(&self) -> Option<&LineItem<'a>> {
        self.selected.and_then(|idx| self.cart.line_at(idx))
    }

    /// Add one to the selected row.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NoSelection`]: no row is selected.
    /// - [`SessionError::Cart`]: the row is weighed, or the quantity overflows.
    pub fn increment_selected(&mut self) -> Result<LineUpdate, SessionError> {
        self.adjust_selected(1)
    }

    /// Take one from the selected row, removing it at zero.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NoSelection`]: no row is selected.
    /// - [`SessionError::Cart`]: the row is weighed.
    pub fn decrement_selected(&mut self) -> Result<LineUpdate, SessionError> {
        self.adjust_selected(-1)
    }

    /// Remove the selected row.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoSelection`] if no row is selected.
    pub fn remove_selected(&mut self) -> Result<LineItem<'a>, SessionError> {
        let key = self.selected_key()?;
        let (idx, removed) = self.cart.remove_item(key)?;

        self.clamp_selection(idx);

        Ok(removed)
    }

    fn adjust_selected(&mut self, delta: i64) -> Result<LineUpdate, SessionError> {
        let key = self.selected_key()?;
        let update = self.cart.update_quantity(key, delta)?;

        if let LineUpdate::Removed(idx) = update {
            self.clamp_selection(idx);
        }

        Ok(update)
    }

    fn selected_key(&self) -> Result<LineKey, SessionError> {
        self.selected_line()
            .map(LineItem::key)
            .ok_or(SessionError::NoSelection)
    }

    fn clamp_selection(&mut self, removed: usize) {
        self.selected = self
            .cart
            .len()
            .checked_sub(1)
            .map(|last| removed.min(last));
    }

    /// Start taking payment. The tender starts at zero.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyCart`] if there is nothing to pay for.
    pub fn begin_payment(&mut self) -> Result<&mut PaymentAttempt, SessionError> {
        match self.cart.begin_payment() {
            Ok(attempt) => Ok(attempt),
            Err(CartError::NothingToPay) => Err(SessionError::EmptyCart),
            Err(err) => Err(err.into()),
        }
    }

    /// Abandon the payment, keeping the lines.
    pub fn cancel_payment(&mut self) -> bool {
        self.cart.cancel_payment().is_some()
    }

    /// The payment being taken.
    pub fn payment(&self) -> Option<&PaymentAttempt> {
        self.cart.payment()
    }

    /// Set the tendered amount.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::PaymentNotStarted`] if payment has not been started.
    pub fn tender(&mut self, amount: Decimal) -> Result<(), SessionError> {
        self.cart
            .payment_mut()
            .ok_or(SessionError::PaymentNotStarted)?
            .tender(amount);

        Ok(())
    }

    /// Tender exactly the total.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::PaymentNotStarted`] if payment has not been started.
    pub fn tender_exact(&mut self) -> Result<(), SessionError> {
        let total = decimal_amount(&self.cart.total());

        self.tender(total)
    }

    /// Press a keypad key on the tender entry.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::PaymentNotStarted`] if payment has not been started.
    pub fn press_key(&mut self, key: char) -> Result<bool, SessionError> {
        Ok(self
            .cart
            .payment_mut()
            .ok_or(SessionError::PaymentNotStarted)?
            .entry_mut()
            .press(key))
    }

    /// Quick-cash amounts for the current total.
    pub fn suggested_tenders(&self) -> SmallVec<[Money<'a, Currency>; 6]> {
        suggested_tenders(&self.cart.total())
    }

    /// Change due for the current tender.
    ///
    /// # Errors
    ///
    /// - [`SessionError::PaymentNotStarted`]: payment has not been started.
    /// - [`SessionError::Payment`]: the tender is short, negative or unreadable.
    pub fn change_due(&self) -> Result<Change<'a>, SessionError> {
        let tendered = self
            .cart
            .payment()
            .ok_or(SessionError::PaymentNotStarted)?
            .tendered(self.cart.currency())?;

        Ok(self.cart.reconcile_payment(tendered)?)
    }

    /// Settle and record the sale, then clear the cart for the next customer.
    ///
    /// Nothing changes unless the recorder accepts the sale.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::EmptyCart`]: the cart is empty or totals zero.
    /// - [`CheckoutError::PaymentNotStarted`]: payment has not been started.
    /// - [`CheckoutError::Payment`]: the tender does not cover the total.
    /// - [`CheckoutError::Submission`]: the recorder failed or refused the sale.
    #[tracing::instrument(
        name = "register.checkout",
        skip(self, submitter),
        fields(location = self.location_id, lines = self.cart.len()),
        err
    )]
    pub async fn checkout(
        &mut self,
        submitter: &dyn SaleSubmitter,
    ) -> Result<CompletedSale<'a>, CheckoutError> {
        if self.cart.is_empty() || self.cart.total().to_minor_units() == 0 {
            warn!("refused checkout of an empty cart");

            return Err(CheckoutError::EmptyCart);
        }

        let tendered = self
            .cart
            .payment()
            .ok_or(CheckoutError::PaymentNotStarted)?
            .tendered(self.cart.currency())?;

        let change = self.cart.reconcile_payment(tendered)?;
        let request = SaleRequest::from_cart(&self.cart, self.location_id, self.customer_id);

        let confirmation = submitter.submit(&request).await?;
        let receipt = Receipt::new(&self.cart, &change).with_confirmation(&confirmation);

        info!(
            id = confirmation.id,
            total = %change.total,
            change = %change.due,
            "sale completed"
        );

        self.cart.finalize();
        self.selected = None;
        self.pending_weight = None;

        Ok(CompletedSale {
            confirmation,
            change,
            receipt,
        })
    }

    /// The product catalog.
    pub fn catalog(&self) -> &Catalog<'a> {
        &self.catalog
    }

    /// The cart.
    pub fn cart(&self) -> &Cart<'a> {
        &self.cart
    }

    /// Selling location.
    pub fn location_id(&self) -> u64 {
        self.location_id
    }

    /// Loyalty customer, if any.
    pub fn customer_id(&self) -> Option<u64> {
        self.customer_id
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::MXN;
    use testresult::TestResult;

    use crate::{checkout::MockSaleSubmitter, fixtures::Fixture};

    use super::*;

    fn register() -> Result<Register<'static>, crate::fixtures::FixtureError> {
        let fixture = Fixture::from_set("market")?;
        let currency = fixture.currency()?;

        Ok(Register::new(fixture.into_catalog(), currency, 1))
    }

    fn kg(tenths: i64) -> Decimal {
        Decimal::new(tenths, 1)
    }

    #[test]
    fn scanning_unit_product_adds_and_selects_it() -> TestResult {
        let mut register = register()?;

        register.scan("123")?;
        let outcome = register.scan("bread")?;

        assert!(matches!(outcome, ScanOutcome::Added(_)));
        assert_eq!(register.cart().len(), 2);
        assert_eq!(register.selected(), Some(1));

        register.scan("123")?;

        assert_eq!(register.cart().len(), 2);
        assert_eq!(register.selected(), Some(0));
        assert_eq!(register.cart().total(), Money::from_minor(9600, MXN));

        Ok(())
    }

    #[test]
    fn blank_scan_is_ignored() -> TestResult {
        let mut register = register()?;

        assert_eq!(register.scan("   ")?, ScanOutcome::Ignored);
        assert!(register.cart().is_empty());

        Ok(())
    }

    #[test]
    fn unknown_scan_is_not_found() -> TestResult {
        let mut register = register()?;

        let result = register.scan("999999");

        assert_eq!(
            result,
            Err(SessionError::Catalog(CatalogError::NotFound(
                "999999".to_string()
            )))
        );

        Ok(())
    }

    #[test]
    fn weighed_product_waits_for_weight() -> TestResult {
        let mut register = register()?;

        let outcome = register.scan("789")?;

        assert!(matches!(outcome, ScanOutcome::WeightRequired(_)));
        assert!(register.cart().is_empty());
        assert_eq!(
            register.pending_weight().map(|product| product.name.as_str()),
            Some("Bananas")
        );

        register.enter_weight(kg(15))?;

        assert!(register.pending_weight().is_none());
        assert_eq!(register.cart().total(), Money::from_minor(2700, MXN));
        assert_eq!(register.selected(), Some(0));

        Ok(())
    }

    #[test]
    fn rejected_weight_keeps_product_waiting() -> TestResult {
        let mut register = register()?;
        register.scan("789")?;

        let result = register.enter_weight(Decimal::ZERO);

        assert_eq!(
            result,
            Err(SessionError::Quantity(QuantityError::NonPositiveWeight(
                Decimal::ZERO
            )))
        );
        assert!(register.pending_weight().is_some());
        assert!(register.cart().is_empty());

        Ok(())
    }

    #[test]
    fn weight_without_pending_product_is_refused() -> TestResult {
        let mut register = register()?;

        assert_eq!(
            register.enter_weight(kg(10)),
            Err(SessionError::NoPendingWeight)
        );

        register.scan("789")?;

        assert!(register.cancel_weight().is_some());
        assert_eq!(
            register.enter_weight(kg(10)),
            Err(SessionError::NoPendingWeight)
        );

        Ok(())
    }

    #[test]
    fn selection_moves_within_bounds() -> TestResult {
        let mut register = register()?;

        assert_eq!(register.select_next(), None);

        register.scan("123")?;
        register.scan("456")?;
        register.scan("321")?;

        assert_eq!(register.select_next(), Some(2));
        assert_eq!(register.select_previous(), Some(1));
        assert_eq!(register.select_previous(), Some(0));
        assert_eq!(register.select_previous(), Some(0));
        assert_eq!(register.select(2)?.name(), "Soda 600ml");
        assert_eq!(register.select(3).err(), Some(SessionError::NoSelection));

        Ok(())
    }

    #[test]
    fn removing_last_row_moves_selection_up() -> TestResult {
        let mut register = register()?;
        register.scan("123")?;
        register.scan("456")?;

        let removed = register.remove_selected()?;

        assert_eq!(removed.name(), "Bread");
        assert_eq!(register.selected(), Some(0));

        register.remove_selected()?;

        assert_eq!(register.selected(), None);
        assert_eq!(register.remove_selected().err(), Some(SessionError::NoSelection));

        Ok(())
    }

    #[test]
    fn decrement_to_zero_removes_row_and_clamps() -> TestResult {
        let mut register = register()?;
        register.scan("123")?;
        register.scan("456")?;
        register.select(0)?;

        assert_eq!(
            register.increment_selected()?,
            LineUpdate::Updated(Quantity::Units(2))
        );
        assert_eq!(
            register.decrement_selected()?,
            LineUpdate::Updated(Quantity::Units(1))
        );
        assert_eq!(register.decrement_selected()?, LineUpdate::Removed(0));
        assert_eq!(register.selected(), Some(0));
        assert_eq!(register.selected_line().map(LineItem::name), Some("Bread"));

        Ok(())
    }

    #[test]
    fn adjusting_weighed_row_is_a_policy_error() -> TestResult {
        let mut register = register()?;
        register.scan("789")?;
        let line = register.enter_weight(kg(15))?;

        assert_eq!(
            register.increment_selected(),
            Err(SessionError::Cart(CartError::WeightedLine(line)))
        );
        assert_eq!(register.cart().total(), Money::from_minor(2700, MXN));

        Ok(())
    }

    #[test]
    fn payment_requires_items() -> TestResult {
        let mut register = register()?;

        assert_eq!(register.begin_payment().err(), Some(SessionError::EmptyCart));
        assert_eq!(
            register.tender(Decimal::TEN),
            Err(SessionError::PaymentNotStarted)
        );

        Ok(())
    }

    #[test]
    fn change_due_follows_keypad_entry() -> TestResult {
        let mut register = register()?;
        register.scan("456")?;
        register.begin_payment()?;

        for key in ['5', '0'] {
            register.press_key(key)?;
        }

        assert_eq!(register.change_due()?.due, Money::from_minor(500, MXN));

        register.tender(Decimal::from(40))?;

        assert!(matches!(
            register.change_due(),
            Err(SessionError::Payment(PaymentError::Insufficient { .. }))
        ));

        register.tender_exact()?;

        assert_eq!(register.change_due()?.due, Money::from_minor(0, MXN));

        Ok(())
    }

    #[test]
    fn suggested_tenders_cover_total() -> TestResult {
        let mut register = register()?;
        register.scan("456")?;

        let suggestions = register.suggested_tenders();

        assert_eq!(suggestions.first(), Some(&Money::from_minor(4500, MXN)));
        assert!(
            suggestions.iter().all(|amount| amount.to_minor_units() >= 4500),
            "suggestion below total"
        );

        Ok(())
    }

    #[tokio::test]
    async fn checkout_records_sale_and_clears_cart() -> TestResult {
        let mut register = register()?.with_customer(7);
        register.scan("456")?;
        register.begin_payment()?;
        register.tender(Decimal::from(50))?;

        let mut submitter = MockSaleSubmitter::new();
        submitter
            .expect_submit()
            .withf(|sale| sale.customer_id == Some(7) && sale.items.len() == 1)
            .times(1)
            .returning(|_| {
                Ok(SaleConfirmation {
                    id: 10,
                    total_amount: Decimal::from(45),
                    status: "completed".to_string(),
                })
            });

        let sale = register.checkout(&submitter).await?;

        assert_eq!(sale.confirmation.id, 10);
        assert_eq!(sale.change.due, Money::from_minor(500, MXN));
        assert_eq!(sale.receipt.sale_id(), Some(10));
        assert!(register.cart().is_empty());
        assert!(register.payment().is_none());
        assert_eq!(register.selected(), None);

        Ok(())
    }

    #[tokio::test]
    async fn failed_submission_keeps_cart() -> TestResult {
        let mut register = register()?;
        register.scan("456")?;
        register.begin_payment()?;
        register.tender(Decimal::from(50))?;

        let mut submitter = MockSaleSubmitter::new();
        submitter
            .expect_submit()
            .returning(|_| Err(SubmissionError::Unavailable("offline".to_string())));

        let result = register.checkout(&submitter).await;

        assert!(matches!(result, Err(CheckoutError::Submission(_))));
        assert_eq!(register.cart().len(), 1);
        assert!(register.payment().is_some());

        Ok(())
    }

    #[tokio::test]
    async fn cart_emptied_after_payment_is_not_submitted() -> TestResult {
        let mut register = register()?;
        register.scan("456")?;
        register.begin_payment()?;
        register.tender(Decimal::from(50))?;

        register.remove_selected()?;

        let mut submitter = MockSaleSubmitter::new();
        submitter.expect_submit().never();

        let result = register.checkout(&submitter).await;

        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
        assert!(register.payment().is_none());

        Ok(())
    }

    #[tokio::test]
    async fn short_tender_is_not_submitted() -> TestResult {
        let mut register = register()?;
        register.scan("456")?;
        register.begin_payment()?;
        register.tender(Decimal::from(20))?;

        let mut submitter = MockSaleSubmitter::new();
        submitter.expect_submit().never();

        let result = register.checkout(&submitter).await;

        assert!(matches!(
            result,
            Err(CheckoutError::Payment(PaymentError::Insufficient { .. }))
        ));
        assert_eq!(register.cart().len(), 1);

        Ok(())
    }
}
