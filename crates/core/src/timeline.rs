//! Delivery and return timeline projection.
//!
//! The order detail page shows a progress bar:
//!
//! ```text
//! Order Placed -> Confirmed -> Processing -> Shipped -> Delivered [-> Return]
//! ```
//!
//! The return stage is appended only when the order is `returned` or has at
//! least one active return request. [`project_timeline`] merges the order's
//! own status with its return requests and produces the stage list together
//! with per-stage completion flags. The projection is a pure function of its
//! inputs and is recomputed on every read, never stored.

use serde::Serialize;

use crate::returns::resolve_active_return;
use crate::types::{Order, OrderStatus, ReturnRequest};

/// The linear progress sequence of an order.
pub const PROGRESS_SEQUENCE: [OrderStatus; 5] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
];

/// Position of `status` in [`PROGRESS_SEQUENCE`].
///
/// Statuses outside the sequence (`cancelled`, `returned`, unknown) map to 0.
#[must_use]
pub fn progress_index(status: OrderStatus) -> usize {
    PROGRESS_SEQUENCE
        .iter()
        .position(|candidate| *candidate == status)
        .unwrap_or(0)
}

/// Identifies a stage on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKey {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Return,
}

impl StageKey {
    /// Stages every timeline starts with, in order.
    pub const BASE: [Self; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
    ];

    /// Customer-facing label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Order Placed",
            Self::Confirmed => "Confirmed",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Return => "Return",
        }
    }

    /// The stage an order status sits on, if it is on the progress sequence.
    #[must_use]
    pub const fn from_order_status(status: OrderStatus) -> Option<Self> {
        match status {
            OrderStatus::Pending => Some(Self::Pending),
            OrderStatus::Confirmed => Some(Self::Confirmed),
            OrderStatus::Processing => Some(Self::Processing),
            OrderStatus::Shipped => Some(Self::Shipped),
            OrderStatus::Delivered => Some(Self::Delivered),
            OrderStatus::Cancelled | OrderStatus::Returned | OrderStatus::Unknown => None,
        }
    }
}

/// One stage of a projected timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimelineStage {
    pub key: StageKey,
    pub label: &'static str,
    pub is_completed: bool,
    pub is_current: bool,
}

/// Render-ready timeline for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineProjection {
    pub stages: Vec<TimelineStage>,
    /// Index into `stages` of the stage the order is on.
    pub current_index: usize,
    /// The return stage (and everything before it) is fully done.
    pub return_completed: bool,
    /// Cancelled orders hide the bar; the fields above are still filled in.
    pub is_suppressed: bool,
}

impl TimelineProjection {
    /// Whether the connector between stage `i` and `i + 1` is filled.
    #[must_use]
    pub const fn connector_filled(&self, i: usize) -> bool {
        i < self.current_index
    }

    /// Fill state of every connector, one fewer than there are stages.
    #[must_use]
    pub fn connectors(&self) -> Vec<bool> {
        (0..self.stages.len().saturating_sub(1))
            .map(|i| self.connector_filled(i))
            .collect()
    }

    /// Whether the return stage is part of this timeline.
    #[must_use]
    pub fn has_return_stage(&self) -> bool {
        self.stages.last().is_some_and(|stage| stage.key == StageKey::Return)
    }
}

/// Where the order currently sits, after return requests are taken into account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResolvedStatus {
    key: Option<StageKey>,
    return_completed: bool,
}

/// Decide the displayed status. Only the first matching rule applies:
///
/// 1. A `returned` order sits on the return stage. It counts as complete unless
///    an active return request says otherwise; with no active request on record
///    the order status is taken as authoritative.
/// 2. A `delivered` order with an active return sits on the return stage, and
///    is complete only when the representative return is completed.
/// 3. Otherwise the order status is used as is.
fn resolve_status(order: &Order, return_requests: &[ReturnRequest]) -> ResolvedStatus {
    let active = resolve_active_return(return_requests);

    match (order.order_status, active) {
        (OrderStatus::Returned, active) => ResolvedStatus {
            key: Some(StageKey::Return),
            return_completed: active.is_none_or(|active| active.is_completed),
        },
        (OrderStatus::Delivered, Some(active)) => ResolvedStatus {
            key: Some(StageKey::Return),
            return_completed: active.is_completed,
        },
        (status, _) => ResolvedStatus {
            key: StageKey::from_order_status(status),
            return_completed: false,
        },
    }
}

/// Project an order and its return requests onto the timeline.
///
/// `return_requests` should already be scoped to `order`; see
/// [`scope_to_order`](crate::returns::scope_to_order).
#[must_use]
pub fn project_timeline(order: &Order, return_requests: &[ReturnRequest]) -> TimelineProjection {
    let include_return_stage = order.order_status == OrderStatus::Returned
        || resolve_active_return(return_requests).is_some();

    let mut keys = StageKey::BASE.to_vec();
    if include_return_stage {
        keys.push(StageKey::Return);
    }

    let resolved = resolve_status(order, return_requests);
    let current_index = resolved
        .key
        .and_then(|key| keys.iter().position(|candidate| *candidate == key))
        .unwrap_or(0);
    let return_completed = resolved.return_completed;

    let stages = keys
        .into_iter()
        .enumerate()
        .map(|(index, key)| {
            let reached = index <= current_index;
            // An in-progress return is reached but never shown as done.
            let is_completed = if !return_completed
                && key == StageKey::Return
                && index == current_index
            {
                false
            } else {
                reached
            };

            TimelineStage {
                key,
                label: key.label(),
                is_completed,
                is_current: index == current_index && !return_completed,
            }
        })
        .collect();

    TimelineProjection {
        stages,
        current_index,
        return_completed,
        is_suppressed: order.is_cancelled(),
    }
}
