//! Catalog
//!
//! Immutable product reference data, looked up by code or by name.

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use thiserror::Error;

use crate::products::{Product, ProductCode, ProductKey};

/// Stock level below which a product is reported as running low.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

/// Catalog lookup errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// No product matches the code or name.
    #[error("item \"{0}\" not found")]
    NotFound(String),

    /// A product with this code is already in the catalog.
    #[error("duplicate product code {0}")]
    DuplicateCode(ProductCode),

    /// A product's currency differs from the catalog's (product currency, catalog currency).
    #[error("product has currency {0}, but catalog has currency {1}")]
    CurrencyMismatch(&'static str, &'static str),
}

/// Catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog<'a> {
    products: SlotMap<ProductKey, Product<'a>>,
    order: Vec<ProductKey>,
    by_code: FxHashMap<ProductCode, ProductKey>,
    by_name: FxHashMap<String, ProductKey>,
}

impl<'a> Catalog<'a> {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product.
    ///
    /// When two products share a name, name lookups find the first one added.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::DuplicateCode`]: the code is already taken.
    /// - [`CatalogError::CurrencyMismatch`]: the price currency differs from earlier products.
    pub fn insert(&mut self, product: Product<'a>) -> Result<ProductKey, CatalogError> {
        if self.by_code.contains_key(&product.code) {
            return Err(CatalogError::DuplicateCode(product.code));
        }

        if let Some(first) = self.iter().next() {
            let expected = first.price.currency();
            let found = product.price.currency();

            if expected != found {
                return Err(CatalogError::CurrencyMismatch(
                    found.iso_alpha_code,
                    expected.iso_alpha_code,
                ));
            }
        }

        let code = product.code.clone();
        let name = product.name.to_lowercase();
        let key = self.products.insert(product);

        self.order.push(key);
        self.by_code.insert(code, key);
        self.by_name.entry(name).or_insert(key);

        Ok(key)
    }

    /// Get a product by key.
    pub fn get(&self, key: ProductKey) -> Option<&Product<'a>> {
        self.products.get(key)
    }

    /// Look up a product by its exact code.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if no product has this code.
    pub fn by_code(&self, code: &str) -> Result<(ProductKey, &Product<'a>), CatalogError> {
        self.by_code
            .get(&ProductCode::from(code))
            .and_then(|key| self.products.get(*key).map(|product| (*key, product)))
            .ok_or_else(|| CatalogError::NotFound(code.to_string()))
    }

    /// Look up a product by display name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if no product has this name.
    pub fn by_name(&self, name: &str) -> Result<(ProductKey, &Product<'a>), CatalogError> {
        self.by_name
            .get(&name.to_lowercase())
            .and_then(|key| self.products.get(*key).map(|product| (*key, product)))
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }

    /// Resolve what was typed or scanned: an exact code first, then a name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if the query is blank or matches nothing.
    pub fn search(&self, query: &str) -> Result<(ProductKey, &Product<'a>), CatalogError> {
        let query = query.trim();

        if query.is_empty() {
            return Err(CatalogError::NotFound(String::new()));
        }

        self.by_code(query).or_else(|_err| self.by_name(query))
    }

    /// Iterate over the products in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &Product<'a>> {
        self.order.iter().filter_map(|key| self.products.get(*key))
    }

    /// Products in a category, in catalog order.
    pub fn by_category<'c>(&'c self, category: &'c str) -> impl Iterator<Item = &'c Product<'a>> {
        self.iter().filter(move |product| product.category == category)
    }

    /// Distinct category labels, in order of first appearance.
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();

        for product in self.iter() {
            if !categories.contains(&product.category.as_str()) {
                categories.push(&product.category);
            }
        }

        categories
    }

    /// Products whose tracked stock is below `threshold`, in catalog order.
    pub fn low_stock(&self, threshold: u32) -> impl Iterator<Item = &Product<'a>> {
        self.iter()
            .filter(move |product| product.stock.is_some_and(|stock| stock < threshold))
    }

    /// Get the number of products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{
        Money,
        iso::{EUR, USD},
    };
    use testresult::TestResult;

    use super::*;

    fn kiosk() -> Result<Catalog<'static>, CatalogError> {
        let mut catalog = Catalog::new();

        for product in [
            Product::new(1_u64, "Water", Money::from_minor(100, USD))
                .with_category("Beverage")
                .with_stock(150),
            Product::new(2_u64, "Soda", Money::from_minor(200, USD))
                .with_category("Beverage")
                .with_stock(45),
            Product::new(3_u64, "Premium Soda", Money::from_minor(500, USD))
                .with_category("Beverage")
                .with_stock(8),
            Product::new(4_u64, "Chips", Money::from_minor(150, USD)).with_category("Snack"),
        ] {
            catalog.insert(product)?;
        }

        Ok(catalog)
    }

    #[test]
    fn lookup_by_code() -> TestResult {
        let catalog = kiosk()?;

        let (_, product) = catalog.by_code("3")?;

        assert_eq!(product.name, "Premium Soda");

        Ok(())
    }

    #[test]
    fn lookup_by_name_ignores_case() -> TestResult {
        let catalog = kiosk()?;

        let (key, product) = catalog.by_name("pREMIUM soda")?;

        assert_eq!(product.code, ProductCode::from(3_u64));
        assert_eq!(catalog.get(key).map(|p| p.name.as_str()), Some("Premium Soda"));

        Ok(())
    }

    #[test]
    fn search_prefers_code_then_name() -> TestResult {
        let catalog = kiosk()?;

        assert_eq!(catalog.search("2")?.1.name, "Soda");
        assert_eq!(catalog.search(" chips ")?.1.name, "Chips");

        Ok(())
    }

    #[test]
    fn search_unknown_or_blank_is_not_found() -> TestResult {
        let catalog = kiosk()?;

        assert_eq!(
            catalog.search("Caviar").err(),
            Some(CatalogError::NotFound("Caviar".to_string()))
        );
        assert!(matches!(catalog.search("   "), Err(CatalogError::NotFound(_))));

        Ok(())
    }

    #[test]
    fn duplicate_code_is_rejected() -> TestResult {
        let mut catalog = kiosk()?;

        let result = catalog.insert(Product::new(1_u64, "Sparkling Water", Money::from_minor(120, USD)));

        assert_eq!(result, Err(CatalogError::DuplicateCode(ProductCode::from(1_u64))));
        assert_eq!(catalog.len(), 4);

        Ok(())
    }

    #[test]
    fn mixed_currency_is_rejected() -> TestResult {
        let mut catalog = kiosk()?;

        let result = catalog.insert(Product::new(9_u64, "Croissant", Money::from_minor(180, EUR)));

        assert_eq!(result, Err(CatalogError::CurrencyMismatch("EUR", "USD")));

        Ok(())
    }

    #[test]
    fn categories_and_category_filter() -> TestResult {
        let catalog = kiosk()?;

        assert_eq!(catalog.categories(), vec!["Beverage", "Snack"]);

        let snacks: Vec<&str> = catalog
            .by_category("Snack")
            .map(|product| product.name.as_str())
            .collect();

        assert_eq!(snacks, vec!["Chips"]);

        Ok(())
    }

    #[test]
    fn low_stock_skips_untracked_products() -> TestResult {
        let catalog = kiosk()?;

        let low: Vec<&str> = catalog
            .low_stock(LOW_STOCK_THRESHOLD)
            .map(|product| product.name.as_str())
            .collect();

        assert_eq!(low, vec!["Premium Soda"]);

        Ok(())
    }
}
