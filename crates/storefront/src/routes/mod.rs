//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                               - Liveness check
//!
//! # Account
//! GET  /account/orders/{id}/timeline         - Delivery/return timeline (JSON)
//! POST /account/orders/{id}/returns/refresh  - Forget cached order and return data
//! ```

pub mod account;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/orders/{id}/timeline", get(account::order_timeline))
        .route(
            "/orders/{id}/returns/refresh",
            post(account::refresh_returns),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new().nest("/account", account_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use secrecy::SecretString;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{OrderApiConfig, ReturnFetchConfig, StorefrontConfig};

    fn app() -> Router {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            order_api: OrderApiConfig {
                base_url: "http://orders.invalid/api/v1".parse().unwrap(),
                token: SecretString::from("k3J9xQ2mL7pV4tR8".to_string()),
                order_cache_ttl: Duration::from_secs(30),
            },
            returns: ReturnFetchConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        };
        routes().with_state(AppState::new(&config))
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_refresh_returns_no_content() {
        let response = app()
            .oneshot(request(Method::POST, "/account/orders/ord_1/returns/refresh"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_blank_order_id_is_bad_request() {
        let response = app()
            .oneshot(request(Method::POST, "/account/orders/%20/returns/refresh"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Bad request: order id is required");
    }

    #[tokio::test]
    async fn test_timeline_is_get_only() {
        let response = app()
            .oneshot(request(Method::POST, "/account/orders/ord_1/timeline"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
