//! Line Items

use rusty_money::{Money, iso::Currency};
use slotmap::new_key_type;

use crate::{
    pricing::{PricingError, line_subtotal},
    products::{PricingUnit, Product, ProductCode},
    quantity::Quantity,
};

new_key_type! {
    /// Line Key
    pub struct LineKey;
}

/// One row of a cart: a product, its quantity and the derived subtotal.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem<'a> {
    key: LineKey,
    code: ProductCode,
    name: String,
    unit: PricingUnit,
    unit_price: Money<'a, Currency>,
    quantity: Quantity,
    subtotal: Money<'a, Currency>,
}

impl<'a> LineItem<'a> {
    /// Creates a line for `product`, pricing it at construction.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the subtotal cannot be calculated.
    pub fn new(
        key: LineKey,
        product: &Product<'a>,
        quantity: Quantity,
    ) -> Result<Self, PricingError> {
        let subtotal = line_subtotal(&product.price, &quantity)?;

        Ok(Self {
            key,
            code: product.code.clone(),
            name: product.name.clone(),
            unit: product.unit,
            unit_price: product.price,
            quantity,
            subtotal,
        })
    }

    /// Returns the line's key
    pub fn key(&self) -> LineKey {
        self.key
    }

    /// Returns the code of the product on this line
    pub fn code(&self) -> &ProductCode {
        &self.code
    }

    /// Returns the product name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether the line is priced per unit or per kilogram
    pub fn unit(&self) -> PricingUnit {
        self.unit
    }

    /// Whether the line holds a weighed product.
    pub fn is_weighted(&self) -> bool {
        self.unit == PricingUnit::PerKilogram
    }

    /// Returns the unit price
    pub fn unit_price(&self) -> &Money<'a, Currency> {
        &self.unit_price
    }

    /// Returns the quantity
    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Returns the subtotal, `quantity × unit price`
    pub fn subtotal(&self) -> &Money<'a, Currency> {
        &self.subtotal
    }

    /// Copy of this line at a new quantity, repriced.
    pub(crate) fn with_quantity(&self, quantity: Quantity) -> Result<Self, PricingError> {
        let subtotal = line_subtotal(&self.unit_price, &quantity)?;

        Ok(Self {
            quantity,
            subtotal,
            ..self.clone()
        })
    }
}
