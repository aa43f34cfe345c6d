//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::orders::OrderApiClient;
use crate::services::ReturnRequestLoader;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the order client and the return request loader.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    orders: Arc<OrderApiClient>,
    returns: ReturnRequestLoader<OrderApiClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The same order client backs both order reads and the return request
    /// loader, so they share one connection pool.
    #[must_use]
    pub fn new(config: &StorefrontConfig) -> Self {
        let orders = Arc::new(OrderApiClient::new(&config.order_api));
        let returns = ReturnRequestLoader::new(Arc::clone(&orders), config.returns);

        Self {
            inner: Arc::new(AppStateInner {
                orders,
                returns,
            }),
        }
    }

    /// Get a reference to the order service client.
    #[must_use]
    pub fn orders(&self) -> &OrderApiClient {
        &self.inner.orders
    }

    /// Get a reference to the return request loader.
    #[must_use]
    pub fn returns(&self) -> &ReturnRequestLoader<OrderApiClient> {
        &self.inner.returns
    }
}
