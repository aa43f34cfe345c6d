//! Business logic services for storefront.
//!
//! # Services
//!
//! - `return_loader` - Per-order coordination of return request fetches

pub mod return_loader;

pub use return_loader::{FetchError, FetchPhase, ReturnRequestLoader};
