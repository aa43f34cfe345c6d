//! Lustre Core - Shared types and order timeline projection.
//!
//! This crate provides the domain types used across Lustre components:
//! - `storefront` - Customer-facing jewelry store and order history
//! - `integration-tests` - Cross-crate behaviour tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients, no clock reads except where a caller
//! explicitly asks for "now". Everything here is safe to call from any thread.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, prices, statuses, and the order/return read models
//! - [`returns`] - Return request aggregation, eligibility window and lifecycle
//! - [`timeline`] - Delivery/return timeline projection consumed by rendering

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod returns;
pub mod timeline;
pub mod types;

pub use returns::{
    ActiveReturn, RETURN_WINDOW_DAYS, ReturnEligibilityError, ReturnError,
    check_return_eligibility, is_within_return_window, resolve_active_return, scope_to_order,
};
pub use timeline::{
    PROGRESS_SEQUENCE, StageKey, TimelineProjection, TimelineStage, progress_index,
    project_timeline,
};
pub use types::*;
