//! Till
//!
//! Till is a point-of-sale cart ledger: scanning products into a cart, pricing
//! unit and weighed lines, taking payment and recording completed sales.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod fixtures;
pub mod lines;
pub mod payment;
pub mod prelude;
pub mod pricing;
pub mod products;
pub mod quantity;
pub mod receipt;
pub mod session;
