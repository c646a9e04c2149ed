//! Products

use std::fmt;

use rusty_money::{Money, iso::Currency};
use slotmap::new_key_type;

new_key_type! {
    /// Product Key
    pub struct ProductKey;
}

/// Identifier printed on a product: a barcode, or a numeric catalog id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductCode(String);

impl ProductCode {
    /// Create a product code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for ProductCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

impl From<u64> for ProductCode {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// What a product's price is charged per.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PricingUnit {
    /// Price per discrete unit.
    #[default]
    Each,

    /// Price per kilogram; quantities are measured weights.
    PerKilogram,
}

/// Product
#[derive(Debug, Clone)]
pub struct Product<'a> {
    /// Barcode or catalog id
    pub code: ProductCode,

    /// Product name
    pub name: String,

    /// Category label
    pub category: String,

    /// Product price, per unit or per kilogram
    pub price: Money<'a, Currency>,

    /// Whether the price is per unit or per kilogram
    pub unit: PricingUnit,

    /// Stock on hand, when tracked
    pub stock: Option<u32>,
}

impl<'a> Product<'a> {
    /// Create a product sold by the unit, with no category and untracked stock.
    pub fn new(
        code: impl Into<ProductCode>,
        name: impl Into<String>,
        price: Money<'a, Currency>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            category: String::new(),
            price,
            unit: PricingUnit::Each,
            stock: None,
        }
    }

    /// Set the category label.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the stock on hand.
    #[must_use]
    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = Some(stock);
        self
    }

    /// Mark the product as priced per kilogram.
    #[must_use]
    pub fn sold_by_weight(mut self) -> Self {
        self.unit = PricingUnit::PerKilogram;
        self
    }

    /// Whether the product is priced per kilogram.
    pub fn is_weighted(&self) -> bool {
        self.unit == PricingUnit::PerKilogram
    }
}
