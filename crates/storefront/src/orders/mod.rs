//! Order service collaborators.
//!
//! # Architecture
//!
//! - The order service owns orders and return requests in its document store;
//!   the storefront only reads them over REST
//! - [`OrderReader`] and [`ReturnRequestReader`] are the seams the rest of the
//!   storefront depends on, so tests can swap in in-memory readers
//! - Orders are cached in-memory via `moka`; return requests are not cached
//!   here because [`ReturnRequestLoader`](crate::services::ReturnRequestLoader)
//!   owns their lifecycle
//!
//! # Example
//!
//! ```rust,ignore
//! use lustre_storefront::orders::{OrderApiClient, OrderReader};
//!
//! let client = OrderApiClient::new(&config.order_api);
//! let order = client.get_order(&OrderId::new("665f1c2e9b1d4a0012ab34cd")).await?;
//! ```

mod client;

use std::future::Future;

use lustre_core::{Order, OrderId, ReturnRequest};
use thiserror::Error;

pub use client::OrderApiClient;

/// Errors that can occur when talking to the order service.
#[derive(Debug, Error)]
pub enum OrderApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the order service.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("Order service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The configured base URL cannot carry a path.
    #[error("Invalid order service URL: {0}")]
    InvalidUrl(String),
}

/// Reads orders from the order service.
pub trait OrderReader: Send + Sync {
    /// Fetch one order by id.
    fn get_order(
        &self,
        id: &OrderId,
    ) -> impl Future<Output = Result<Order, OrderApiError>> + Send;
}

/// Reads the return requests filed against an order.
pub trait ReturnRequestReader: Send + Sync + 'static {
    /// Fetch every return request for `order_id`, rejected ones included.
    fn get_return_requests(
        &self,
        order_id: &OrderId,
    ) -> impl Future<Output = Result<Vec<ReturnRequest>, OrderApiError>> + Send;
}
