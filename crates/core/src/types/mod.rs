//! Core types for Lustre.
//!
//! This module provides type-safe wrappers and read models for orders and
//! return requests.

pub mod id;
pub mod order;
pub mod price;
pub mod status;

pub use id::*;
pub use order::{Order, OrderItem, ReturnRequest};
pub use price::{CurrencyCode, Price};
pub use status::*;
