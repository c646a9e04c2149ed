//! Receipt

use std::io;

use rusty_money::{Money, iso::Currency};
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{Alignment, Style, Theme, object::Columns},
};
use thiserror::Error;

use crate::{
    cart::Cart,
    checkout::SaleConfirmation,
    lines::LineItem,
    payment::Change,
};

/// Errors that can occur when writing a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Receipt for a completed sale.
#[derive(Debug, Clone)]
pub struct Receipt<'a> {
    /// Transaction id assigned when the sale was recorded
    sale_id: Option<u64>,

    /// Lines sold, in cart order
    lines: Vec<LineItem<'a>>,

    /// Total paid for all lines
    total: Money<'a, Currency>,

    /// Amount handed over
    tendered: Money<'a, Currency>,

    /// Change given back
    change: Money<'a, Currency>,
}

impl<'a> Receipt<'a> {
    /// Build a receipt from the cart as it stood when payment was reconciled.
    pub fn new(cart: &Cart<'a>, change: &Change<'a>) -> Self {
        Self {
            sale_id: None,
            lines: cart.lines().to_vec(),
            total: change.total,
            tendered: change.tendered,
            change: change.due,
        }
    }

    /// Attach the recorded transaction id.
    #[must_use]
    pub fn with_confirmation(mut self, confirmation: &SaleConfirmation) -> Self {
        self.sale_id = Some(confirmation.id);
        self
    }

    /// Transaction id, once recorded.
    pub fn sale_id(&self) -> Option<u64> {
        self.sale_id
    }

    /// Lines sold.
    pub fn lines(&self) -> &[LineItem<'a>] {
        &self.lines
    }

    /// Total paid.
    pub fn total(&self) -> Money<'a, Currency> {
        self.total
    }

    /// Amount handed over.
    pub fn tendered(&self) -> Money<'a, Currency> {
        self.tendered
    }

    /// Change given back.
    pub fn change(&self) -> Money<'a, Currency> {
        self.change
    }

    /// Writes the receipt as a table followed by the payment summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the receipt cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReceiptError> {
        let mut builder = Builder::default();

        builder.push_record(["", "Item", "Qty", "Price", "Subtotal"]);

        for (idx, line) in self.lines.iter().enumerate() {
            builder.push_record([
                format!("#{:<3}", idx + 1),
                line.name().to_string(),
                line.quantity().to_string(),
                line.unit_price().to_string(),
                line.subtotal().to_string(),
            ]);
        }

        let mut table = builder.build();
        let mut theme = Theme::from(Style::modern_rounded());

        theme.remove_horizontal_lines();
        theme.insert_horizontal_line(
            1,
            HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤')),
        );

        table.with(theme);
        table.modify(Columns::new(2..5), Alignment::right());

        if let Some(id) = self.sale_id {
            writeln!(out, "Sale #{id}")?;
        }

        writeln!(out, "{table}")?;

        let summary = [
            ("Total:", self.total),
            ("Tendered:", self.tendered),
            ("Change:", self.change),
        ];

        let value_width = summary
            .iter()
            .map(|(_, value)| value.to_string().chars().count())
            .max()
            .unwrap_or_default();

        for (label, value) in summary {
            writeln!(out, "{label:>10}  {:>value_width$}", value.to_string())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rusty_money::iso::MXN;
    use testresult::TestResult;

    use crate::{products::Product, quantity::Quantity};

    use super::*;

    fn sold_cart() -> Result<Cart<'static>, crate::cart::CartError> {
        let mut cart = Cart::new(MXN);

        cart.add_item(
            &Product::new("456", "Bread", Money::from_minor(4500, MXN)),
            Quantity::Units(2),
        )?;

        cart.add_item(
            &Product::new("654", "Avocado", Money::from_minor(8500, MXN)).sold_by_weight(),
            Quantity::Weight(Decimal::new(5, 1)),
        )?;

        Ok(cart)
    }

    #[test]
    fn receipt_copies_lines_and_payment() -> TestResult {
        let cart = sold_cart()?;
        let change = cart.reconcile_payment(Money::from_minor(20000, MXN))?;

        let receipt = Receipt::new(&cart, &change);

        assert_eq!(receipt.lines().len(), 2);
        assert_eq!(receipt.total(), Money::from_minor(13250, MXN));
        assert_eq!(receipt.change(), Money::from_minor(6750, MXN));
        assert_eq!(receipt.sale_id(), None);

        Ok(())
    }

    #[test]
    fn write_to_lists_lines_and_summary() -> TestResult {
        let cart = sold_cart()?;
        let change = cart.reconcile_payment(Money::from_minor(20000, MXN))?;

        let receipt = Receipt::new(&cart, &change).with_confirmation(&SaleConfirmation {
            id: 42,
            total_amount: Decimal::new(13250, 2),
            status: "completed".to_string(),
        });

        let mut out = Vec::new();
        receipt.write_to(&mut out)?;

        let text = String::from_utf8(out)?;

        assert!(text.starts_with("Sale #42"), "missing sale header: {text}");
        assert!(text.contains("Bread"), "missing bread line: {text}");
        assert!(text.contains("0.500 kg"), "missing weighed quantity: {text}");
        assert!(text.contains("Change:"), "missing change line: {text}");

        Ok(())
    }
}
