//! Checkout
//!
//! Handing a finished sale to whatever records it. The cart only needs to know
//! whether the hand-off succeeded.

use std::sync::Mutex;

use async_trait::async_trait;
use mockall::automock;
use reqwest::Client;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    cart::Cart,
    pricing::{MINOR_SCALE, decimal_amount},
};

/// One sold line as recorded by the back office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItem {
    /// Product code
    pub product_id: String,

    /// Units, or kilograms for weighed products
    pub quantity: Decimal,

    /// Price per unit or per kilogram, in major units
    pub unit_price: Decimal,
}

/// A completed sale, ready to be recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRequest {
    /// Store or till the sale was made at
    pub selling_location_id: u64,

    /// Loyalty customer, when one was selected
    pub customer_id: Option<u64>,

    /// Lines sold, in cart order
    pub items: Vec<SaleItem>,
}

impl SaleRequest {
    /// Snapshot the lines of `cart`.
    pub fn from_cart(cart: &Cart<'_>, selling_location_id: u64, customer_id: Option<u64>) -> Self {
        let items = cart
            .iter()
            .map(|line| SaleItem {
                product_id: line.code().to_string(),
                quantity: line.quantity().as_decimal(),
                unit_price: decimal_amount(line.unit_price()),
            })
            .collect();

        Self {
            selling_location_id,
            customer_id,
            items,
        }
    }
}

/// Acknowledgement returned once a sale has been recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleConfirmation {
    /// Transaction id
    pub id: u64,

    /// Total recorded, in major units
    pub total_amount: Decimal,

    /// Transaction status
    pub status: String,
}

/// Errors that can occur while recording a sale.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// An HTTP transport or serialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server refused the sale.
    #[error("sale rejected with status {status}: {detail}")]
    Rejected {
        /// HTTP status code
        status: u16,

        /// Reason given by the server
        detail: String,
    },

    /// The recorder cannot take sales right now.
    #[error("sale recorder unavailable: {0}")]
    Unavailable(String),
}

/// Records completed sales.
#[automock]
#[async_trait]
pub trait SaleSubmitter: Send + Sync {
    /// Record a sale.
    async fn submit(&self, sale: &SaleRequest) -> Result<SaleConfirmation, SubmissionError>;
}

/// Configuration for recording sales over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSubmitterConfig {
    /// API base address, e.g. `"http://localhost:8000"`.
    pub base_url: String,

    /// Bearer token, when the API requires one.
    pub token: Option<String>,
}

/// Records sales by posting them to `{base_url}/sales`.
#[derive(Debug, Clone)]
pub struct HttpSaleSubmitter {
    config: HttpSubmitterConfig,
    http: Client,
}

impl HttpSaleSubmitter {
    /// Create a new submitter from the given configuration.
    #[must_use]
    pub fn new(config: HttpSubmitterConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn sales_url(&self) -> String {
        format!("{}/sales", self.config.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

#[async_trait]
impl SaleSubmitter for HttpSaleSubmitter {
    #[tracing::instrument(
        name = "checkout.http.submit",
        skip(self, sale),
        fields(items = sale.items.len()),
        err
    )]
    async fn submit(&self, sale: &SaleRequest) -> Result<SaleConfirmation, SubmissionError> {
        let mut request = self.http.post(self.sales_url()).json(sale);

        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();

            let detail = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.detail)
                .unwrap_or(text);

            warn!(status, %detail, "sale rejected");

            return Err(SubmissionError::Rejected { status, detail });
        }

        let confirmation: SaleConfirmation = response.json().await?;

        debug!(id = confirmation.id, "sale recorded");

        Ok(confirmation)
    }
}

/// Records sales in memory, for running without a back office.
#[derive(Debug, Default)]
pub struct LocalSaleLog {
    sales: Mutex<Vec<SaleRequest>>,
}

impl LocalSaleLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sales recorded so far.
    ///
    /// # Errors
    ///
    /// Returns [`SubmissionError::Unavailable`] if the log lock is poisoned.
    pub fn sales(&self) -> Result<Vec<SaleRequest>, SubmissionError> {
        self.sales
            .lock()
            .map(|sales| sales.clone())
            .map_err(|err| SubmissionError::Unavailable(err.to_string()))
    }
}

#[async_trait]
impl SaleSubmitter for LocalSaleLog {
    async fn submit(&self, sale: &SaleRequest) -> Result<SaleConfirmation, SubmissionError> {
        let total_amount = sale
            .items
            .iter()
            .map(|item| {
                (item.quantity * item.unit_price)
                    .round_dp_with_strategy(MINOR_SCALE, RoundingStrategy::MidpointAwayFromZero)
            })
            .sum();

        let mut sales = self
            .sales
            .lock()
            .map_err(|err| SubmissionError::Unavailable(err.to_string()))?;

        sales.push(sale.clone());

        let id = u64::try_from(sales.len())
            .map_err(|err| SubmissionError::Unavailable(err.to_string()))?;

        Ok(SaleConfirmation {
            id,
            total_amount,
            status: String::from("completed"),
        })
    }
}
