//! Till prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{Cart, CartError, LineUpdate},
    catalog::{Catalog, CatalogError},
    checkout::{
        HttpSaleSubmitter, HttpSubmitterConfig, LocalSaleLog, SaleConfirmation, SaleItem,
        SaleRequest, SaleSubmitter, SubmissionError,
    },
    lines::{LineItem, LineKey},
    payment::{AmountEntry, Change, PaymentAttempt, PaymentError, suggested_tenders},
    pricing::PricingError,
    products::{PricingUnit, Product, ProductCode, ProductKey},
    quantity::{Quantity, QuantityError},
    receipt::{Receipt, ReceiptError},
    session::{CheckoutError, CompletedSale, Register, ScanOutcome, SessionError},
};
