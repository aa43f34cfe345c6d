//! Integration tests for Lustre.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p lustre-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `timeline_properties` - timeline projection and return window behavior
//!   exercised through the public `lustre-core` API
//! - `return_fetch_coordination` - the storefront's return request loader
//!   against an in-memory order service, on a paused tokio clock
//!
//! Neither category needs a running order service.
