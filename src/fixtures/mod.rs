//! Fixtures
//!
//! Catalogs described in YAML under `<base>/catalogs/<name>.yml`.

use std::{fs, path::PathBuf};

use rusty_money::iso::Currency;
use thiserror::Error;

use crate::{
    cart::Cart,
    catalog::{Catalog, CatalogError},
    fixtures::products::CatalogFixture,
    products::Product,
};

pub mod products;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Currency mismatch between products
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// No products loaded yet
    #[error("No products loaded yet; currency unknown")]
    NoCurrency,

    /// Catalog rejected a product
    #[error("Failed to build catalog: {0}")]
    Catalog(#[from] CatalogError),
}

/// Fixture
#[derive(Debug)]
pub struct Fixture<'a> {
    /// Base path for fixture files
    base_path: PathBuf,

    /// Products loaded so far
    catalog: Catalog<'a>,

    /// Currency for the fixture set
    currency: Option<&'a Currency>,
}

impl<'a> Fixture<'a> {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            catalog: Catalog::new(),
            currency: None,
        }
    }

    /// Load a catalog from a YAML fixture file, appending its products.
    ///
    /// The whole file is validated before anything is added, so a failed load
    /// leaves the fixture as it was.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, a price is
    /// malformed, currencies are mixed or a product code repeats.
    pub fn load_catalog(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("catalogs").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: CatalogFixture = serde_norway::from_str(&contents)?;

        let mut catalog = self.catalog.clone();
        let mut currency = self.currency;

        for product_fixture in fixture.products {
            let product: Product<'a> = product_fixture.try_into()?;
            let product_currency = product.price.currency();

            match currency {
                Some(expected) if expected != product_currency => {
                    return Err(FixtureError::CurrencyMismatch(
                        expected.iso_alpha_code.to_string(),
                        product_currency.iso_alpha_code.to_string(),
                    ));
                }
                Some(_) => {}
                None => currency = Some(product_currency),
            }

            catalog.insert(product)?;
        }

        self.catalog = catalog;
        self.currency = currency;

        Ok(self)
    }

    /// Load a named catalog from the default fixtures directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        let mut fixture = Self::new();

        fixture.load_catalog(name)?;

        Ok(fixture)
    }

    /// Get the loaded catalog
    pub fn catalog(&self) -> &Catalog<'a> {
        &self.catalog
    }

    /// Take the loaded catalog
    pub fn into_catalog(self) -> Catalog<'a> {
        self.catalog
    }

    /// Create an empty cart in the catalog's currency
    ///
    /// # Errors
    ///
    /// Returns an error if no products have been loaded yet.
    pub fn cart(&self) -> Result<Cart<'a>, FixtureError> {
        Ok(Cart::new(self.currency()?))
    }

    /// Get the currency
    ///
    /// # Errors
    ///
    /// Returns an error if no products have been loaded yet.
    pub fn currency(&self) -> Result<&'a Currency, FixtureError> {
        self.currency.ok_or(FixtureError::NoCurrency)
    }
}

impl Default for Fixture<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use rusty_money::iso::{MXN, USD};
    use testresult::TestResult;

    use crate::products::PricingUnit;

    use super::*;

    fn write_fixture(base: &Path, name: &str, contents: &str) -> TestResult {
        let dir = base.join("catalogs");

        fs::create_dir_all(&dir)?;
        fs::write(dir.join(format!("{name}.yml")), contents)?;

        Ok(())
    }

    #[test]
    fn market_catalog_loads_in_file_order() -> TestResult {
        let fixture = Fixture::from_set("market")?;
        let catalog = fixture.catalog();

        assert_eq!(catalog.len(), 8);
        assert_eq!(fixture.currency()?, MXN);

        let names: Vec<&str> = catalog.iter().map(|p| p.name.as_str()).take(3).collect();

        assert_eq!(names, vec!["Milk 1L", "Bread", "Bananas"]);

        let (_, bananas) = catalog.by_code("789")?;

        assert_eq!(bananas.unit, PricingUnit::PerKilogram);
        assert_eq!(bananas.price.to_minor_units(), 1800);

        Ok(())
    }

    #[test]
    fn kiosk_catalog_tracks_stock() -> TestResult {
        let fixture = Fixture::from_set("kiosk")?;
        let (_, water) = fixture.catalog().by_name("water")?;

        assert_eq!(water.stock, Some(150));
        assert_eq!(fixture.currency()?, USD);

        Ok(())
    }

    #[test]
    fn fixture_cart_uses_catalog_currency() -> TestResult {
        let fixture = Fixture::from_set("kiosk")?;
        let cart = fixture.cart()?;

        assert!(cart.is_empty());
        assert_eq!(cart.currency(), USD);

        Ok(())
    }

    #[test]
    fn missing_catalog_is_io_error() {
        let result = Fixture::from_set("does-not-exist");

        assert!(matches!(result, Err(FixtureError::Io(_))));
    }

    #[test]
    fn fixture_no_currency_returns_error() {
        let fixture = Fixture::new();

        assert!(matches!(fixture.currency(), Err(FixtureError::NoCurrency)));
        assert!(matches!(fixture.cart(), Err(FixtureError::NoCurrency)));
    }

    #[test]
    fn load_catalog_rejects_currency_mismatch() -> TestResult {
        let dir = tempfile::tempdir()?;

        write_fixture(
            dir.path(),
            "usd_set",
            "products:\n  - code: \"1\"\n    name: Apple\n    price: 1.00 USD\n",
        )?;

        write_fixture(
            dir.path(),
            "mxn_set",
            "products:\n  - code: \"2\"\n    name: Banana\n    price: 1.00 MXN\n",
        )?;

        let mut fixture = Fixture::with_base_path(dir.path());

        fixture.load_catalog("usd_set")?;

        let result = fixture.load_catalog("mxn_set");

        assert!(matches!(result, Err(FixtureError::CurrencyMismatch(_, _))));

        Ok(())
    }

    #[test]
    fn load_catalog_rejects_duplicate_codes() -> TestResult {
        let dir = tempfile::tempdir()?;

        write_fixture(
            dir.path(),
            "dupes",
            "products:\n  - code: \"1\"\n    name: Apple\n    price: 1.00 USD\n  - code: \"1\"\n    name: Pear\n    price: 1.20 USD\n",
        )?;

        let result = Fixture::with_base_path(dir.path())
            .load_catalog("dupes")
            .map(|fixture| fixture.catalog().len());

        assert!(matches!(
            result,
            Err(FixtureError::Catalog(CatalogError::DuplicateCode(_)))
        ));

        Ok(())
    }

    #[test]
    fn failed_load_leaves_fixture_unchanged() -> TestResult {
        let dir = tempfile::tempdir()?;

        write_fixture(
            dir.path(),
            "base",
            "products:\n  - code: \"1\"\n    name: Apple\n    price: 1.00 USD\n",
        )?;

        write_fixture(
            dir.path(),
            "late_duplicate",
            "products:\n  - code: \"2\"\n    name: Pear\n    price: 1.20 USD\n  - code: \"1\"\n    name: Plum\n    price: 0.90 USD\n",
        )?;

        let mut fixture = Fixture::with_base_path(dir.path());

        fixture.load_catalog("base")?;

        let result = fixture.load_catalog("late_duplicate");

        assert!(matches!(
            result,
            Err(FixtureError::Catalog(CatalogError::DuplicateCode(_)))
        ));
        assert_eq!(fixture.catalog().len(), 1);
        assert!(fixture.catalog().by_code("2").is_err());

        Ok(())
    }

    #[test]
    fn mixed_currency_file_sets_no_currency() -> TestResult {
        let dir = tempfile::tempdir()?;

        write_fixture(
            dir.path(),
            "mixed",
            "products:\n  - code: \"1\"\n    name: Apple\n    price: 1.00 USD\n  - code: \"2\"\n    name: Banana\n    price: 1.00 MXN\n",
        )?;

        let mut fixture = Fixture::with_base_path(dir.path());

        let result = fixture.load_catalog("mixed");

        assert!(matches!(result, Err(FixtureError::CurrencyMismatch(_, _))));
        assert!(fixture.catalog().is_empty());
        assert!(matches!(fixture.currency(), Err(FixtureError::NoCurrency)));

        Ok(())
    }

    #[test]
    fn fixture_default_matches_new() {
        let fixture = Fixture::default();

        assert_eq!(fixture.base_path, PathBuf::from("./fixtures"));
        assert!(fixture.catalog.is_empty());
    }
}
