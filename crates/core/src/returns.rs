//! Return request aggregation, eligibility and lifecycle rules.
//!
//! An order may carry several return requests, one per returned line item,
//! each moving through its own lifecycle. The timeline shows a single return
//! stage, so one request has to represent them all:
//!
//! 1. Rejected requests are ignored.
//! 2. The request furthest along (`pending < approved < processing < completed`)
//!    wins.
//! 3. Ties go to the request created first, then to the one listed first.
//!
//! The return window is a separate concern: it only decides whether a customer
//! may open a new request. A request filed inside the window stays visible on
//! the timeline after the window closes.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{
    Order, OrderId, OrderStatus, PaymentStatus, ReturnRequest, ReturnRequestId,
    ReturnRequestStatus,
};

/// Days after payment during which a return may be opened.
pub const RETURN_WINDOW_DAYS: f64 = 7.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Errors from changing a return request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReturnError {
    /// The requested status change is not part of the lifecycle.
    #[error("cannot move return request from {from} to {to}")]
    InvalidTransition {
        from: ReturnRequestStatus,
        to: ReturnRequestStatus,
    },

    /// The order or item cannot be returned.
    #[error("return not allowed: {0}")]
    Ineligible(#[from] ReturnEligibilityError),
}

/// Reasons a customer may not open a return for an item.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReturnEligibilityError {
    #[error("order has not been delivered (status: {0})")]
    NotDelivered(OrderStatus),

    #[error("order has not been paid (payment status: {0})")]
    NotPaid(PaymentStatus),

    #[error("the 7-day return window has closed")]
    WindowClosed,

    #[error("item {0} is not part of this order")]
    UnknownItem(String),

    #[error("item {sku} already has an open return request ({existing})")]
    AlreadyRequested {
        sku: String,
        existing: ReturnRequestId,
    },
}

/// The return request chosen to represent an order's return progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveReturn<'a> {
    pub representative: &'a ReturnRequest,
    pub is_completed: bool,
}

impl ActiveReturn<'_> {
    /// Status of the representative request.
    #[must_use]
    pub const fn status(&self) -> ReturnRequestStatus {
        self.representative.status
    }
}

/// Keep only the return requests that belong to `order_id`.
#[must_use]
pub fn scope_to_order(order_id: &OrderId, requests: &[ReturnRequest]) -> Vec<ReturnRequest> {
    requests
        .iter()
        .filter(|request| &request.order_id == order_id)
        .cloned()
        .collect()
}

/// Pick the representative active return, if any.
///
/// Highest priority wins; ties are broken by earliest `created_at`, then by
/// position in `requests`. Position only matters between requests created at
/// the same instant: an equally advanced request created earlier wins even
/// when it is listed later, so callers need not sort `requests` and must not
/// rely on their order to choose the representative. Requests with an unknown
/// status have priority 0 and only win when nothing else is active.
#[must_use]
pub fn resolve_active_return(requests: &[ReturnRequest]) -> Option<ActiveReturn<'_>> {
    requests
        .iter()
        .enumerate()
        .filter(|(_, request)| request.status.is_active())
        .min_by_key(|(position, request)| {
            (
                Reverse(request.status.priority()),
                request.created_at,
                *position,
            )
        })
        .map(|(_, representative)| ActiveReturn {
            representative,
            is_completed: representative.status == ReturnRequestStatus::Completed,
        })
}

/// Whether an order paid at `paid_at` is still inside the return window.
///
/// The age is measured in fractional days, so an order exactly seven days old
/// is still eligible. A payment timestamp in the future (clock skew) is not.
#[must_use]
pub fn is_within_return_window(paid_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    let Some(paid_at) = paid_at else {
        return false;
    };

    #[allow(clippy::cast_precision_loss)] // millisecond ages stay far below 2^52
    let age_days = (now - paid_at).num_milliseconds() as f64 / MILLIS_PER_DAY;

    (0.0..=RETURN_WINDOW_DAYS).contains(&age_days)
}

/// Decide whether the customer may open a return for `item_sku`.
///
/// `existing` may contain requests for other orders; they are ignored.
///
/// # Errors
///
/// Returns the first failed condition: the order must be delivered and paid,
/// inside the return window, contain the item, and have no active return for
/// that item already.
pub fn check_return_eligibility(
    order: &Order,
    item_sku: &str,
    existing: &[ReturnRequest],
    now: DateTime<Utc>,
) -> Result<(), ReturnEligibilityError> {
    if order.order_status != OrderStatus::Delivered {
        return Err(ReturnEligibilityError::NotDelivered(order.order_status));
    }
    if !order.is_paid() {
        return Err(ReturnEligibilityError::NotPaid(order.payment_status));
    }
    if !is_within_return_window(order.paid_at, now) {
        return Err(ReturnEligibilityError::WindowClosed);
    }
    if order.item_by_sku(item_sku).is_none() {
        return Err(ReturnEligibilityError::UnknownItem(item_sku.to_string()));
    }
    if let Some(open) = existing.iter().find(|request| {
        request.order_id == order.id && request.item_sku == item_sku && request.status.is_active()
    }) {
        return Err(ReturnEligibilityError::AlreadyRequested {
            sku: item_sku.to_string(),
            existing: open.id.clone(),
        });
    }
    Ok(())
}

impl ReturnRequest {
    /// Open a new pending return request for one item of `order`.
    ///
    /// # Errors
    ///
    /// Returns `ReturnError::Ineligible` if [`check_return_eligibility`] fails.
    pub fn open(
        id: ReturnRequestId,
        order: &Order,
        item_sku: &str,
        reason: Option<String>,
        existing: &[Self],
        now: DateTime<Utc>,
    ) -> Result<Self, ReturnError> {
        check_return_eligibility(order, item_sku, existing, now)?;

        Ok(Self {
            id,
            order_id: order.id.clone(),
            item_sku: item_sku.to_string(),
            status: ReturnRequestStatus::Pending,
            reason,
            created_at: now,
            updated_at: None,
        })
    }

    /// Move the request to `next`.
    ///
    /// # Errors
    ///
    /// Returns `ReturnError::InvalidTransition` if the lifecycle does not allow
    /// the change. The request is left untouched in that case.
    pub fn transition(
        &mut self,
        next: ReturnRequestStatus,
        at: DateTime<Utc>,
    ) -> Result<(), ReturnError> {
        if !self.status.can_transition_to(next) {
            return Err(ReturnError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Some(at);
        Ok(())
    }
}
