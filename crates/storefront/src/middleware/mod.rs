//! HTTP middleware for the storefront.
//!
//! Only request ids live here. Tracing and Sentry are tower layers wired up
//! in `main.rs`; the request id middleware runs inside the `TraceLayer` span
//! so it can fill in that span's `request_id` field.

pub mod request_id;

pub use request_id::request_id_middleware;
