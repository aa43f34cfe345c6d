//! REST client for the order service.
//!
//! Uses `reqwest` for HTTP and caches orders using `moka`.

use std::sync::Arc;

use lustre_core::{Order, OrderId, ReturnRequest, scope_to_order};
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::{OrderApiError, OrderReader, ReturnRequestReader};
use crate::config::OrderApiConfig;

/// Client for the order service REST API.
///
/// Cheap to clone; clones share the HTTP connection pool and order cache.
#[derive(Clone)]
pub struct OrderApiClient {
    inner: Arc<OrderApiClientInner>,
}

struct OrderApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: SecretString,
    orders: Cache<OrderId, Order>,
}

impl OrderApiClient {
    /// Create a new order service client.
    #[must_use]
    pub fn new(config: &OrderApiConfig) -> Self {
        let orders = Cache::builder()
            .max_capacity(5_000)
            .time_to_live(config.order_cache_ttl)
            .build();

        Self {
            inner: Arc::new(OrderApiClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                token: config.token.clone(),
                orders,
            }),
        }
    }

    /// Drop a cached order so the next read goes to the order service.
    pub async fn invalidate_order(&self, id: &OrderId) {
        self.inner.orders.invalidate(id).await;
    }

    /// GET `url` and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, OrderApiError> {
        let response = self
            .inner
            .client
            .get(url.clone())
            .bearer_auth(self.inner.token.expose_secret())
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(OrderApiError::RateLimited(retry_after));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(OrderApiError::NotFound(url.path().to_string()));
        }

        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Order service returned non-success status"
            );
            return Err(OrderApiError::Status {
                status: status.as_u16(),
                body: response_text.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse order service response"
            );
            OrderApiError::Parse(e)
        })
    }
}

impl OrderReader for OrderApiClient {
    #[instrument(skip(self), fields(order_id = %id))]
    async fn get_order(&self, id: &OrderId) -> Result<Order, OrderApiError> {
        if let Some(order) = self.inner.orders.get(id).await {
            debug!("Cache hit for order");
            return Ok(order);
        }

        let url = endpoint(&self.inner.base_url, &["orders", id.as_str()])?;
        let order: Order = self.get_json(url).await?;

        self.inner.orders.insert(id.clone(), order.clone()).await;

        Ok(order)
    }
}

impl ReturnRequestReader for OrderApiClient {
    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn get_return_requests(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<ReturnRequest>, OrderApiError> {
        let url = endpoint(
            &self.inner.base_url,
            &["orders", order_id.as_str(), "return-requests"],
        )?;
        let requests: Vec<ReturnRequest> = self.get_json(url).await?;
        debug!(count = requests.len(), "Fetched return requests");

        Ok(scope_to_order(order_id, &requests))
    }
}

/// Append path segments to the base URL, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, OrderApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| OrderApiError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
