//! Account route handlers.
//!
//! Order pages render their delivery/return progress bar from the JSON
//! produced here.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use lustre_core::{
    Order, OrderId, OrderStatus, ReturnRequest, ReturnRequestId, ReturnRequestStatus,
    TimelineProjection, check_return_eligibility, project_timeline,
};
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::orders::OrderReader;
use crate::services::FetchPhase;
use crate::state::AppState;

/// Timeline payload for the order detail page.
#[derive(Debug, Clone, Serialize)]
pub struct OrderTimelineView {
    pub order_id: OrderId,
    pub order_status: OrderStatus,
    pub timeline: TimelineView,
    /// At least one item may still be returned.
    pub return_eligible: bool,
    pub returns: Vec<ReturnSummaryView>,
    /// How far the return request fetch got; `failed` means `returns` may be incomplete.
    pub returns_phase: FetchPhase,
}

/// Projection plus connector fill state.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineView {
    #[serde(flatten)]
    pub projection: TimelineProjection,
    pub connectors: Vec<bool>,
}

/// One return request as listed under the timeline.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnSummaryView {
    pub id: ReturnRequestId,
    pub item_sku: String,
    pub item_name: Option<String>,
    /// Line total of the returned item, formatted for display (`"$1200.00"`).
    pub item_total: Option<String>,
    pub status: ReturnRequestStatus,
}

/// Assemble the timeline payload from an order and its known return requests.
#[must_use]
pub fn build_timeline_view(
    order: &Order,
    requests: &[ReturnRequest],
    returns_phase: FetchPhase,
    now: DateTime<Utc>,
) -> OrderTimelineView {
    let projection = project_timeline(order, requests);
    let connectors = projection.connectors();

    let return_eligible = order
        .items
        .iter()
        .any(|item| check_return_eligibility(order, &item.sku, requests, now).is_ok());

    let returns = requests
        .iter()
        .map(|request| {
            let item = order.item_by_sku(&request.item_sku);
            ReturnSummaryView {
                id: request.id.clone(),
                item_sku: request.item_sku.clone(),
                item_name: item.map(|item| item.name.clone()),
                item_total: item.map(|item| item.line_total().display()),
                status: request.status,
            }
        })
        .collect();

    OrderTimelineView {
        order_id: order.id.clone(),
        order_status: order.order_status,
        timeline: TimelineView {
            projection,
            connectors,
        },
        return_eligible,
        returns,
        returns_phase,
    }
}

/// Order timeline as JSON.
///
/// Waits for the order's return requests to load; if that fails the timeline
/// is built without them.
#[instrument(skip(state))]
pub async fn order_timeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderTimelineView>> {
    let order_id = parse_order_id(id)?;
    add_breadcrumb(
        "orders",
        "Viewed order timeline",
        Some(&[("order_id", order_id.as_str())]),
    );

    let order = state.orders().get_order(&order_id).await?;
    let requests = state.returns().load(&order_id).await;
    let phase = state.returns().phase(&order_id);

    Ok(Json(build_timeline_view(&order, &requests, phase, Utc::now())))
}

/// Forget cached order and return data so the next view fetches fresh.
#[instrument(skip(state))]
pub async fn refresh_returns(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let order_id = parse_order_id(id)?;

    state.returns().reset(&order_id);
    state.orders().invalidate_order(&order_id).await;

    Ok(StatusCode::NO_CONTENT)
}

fn parse_order_id(raw: String) -> Result<OrderId> {
    if raw.trim().is_empty() {
        return Err(AppError::BadRequest("order id is required".to_string()));
    }
    Ok(OrderId::new(raw))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::{Duration, TimeZone};
    use lustre_core::{CurrencyCode, OrderItem, OrderItemId, PaymentStatus, Price};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 15, 9, 30, 0).unwrap()
    }

    fn order(status: OrderStatus, paid_days_ago: i64) -> Order {
        Order {
            id: OrderId::new("ord_1"),
            order_status: status,
            payment_status: PaymentStatus::Paid,
            paid_at: Some(now() - Duration::days(paid_days_ago)),
            items: vec![
                OrderItem {
                    id: OrderItemId::new("itm_1"),
                    sku: "RG-001".to_string(),
                    name: "Solitaire ring".to_string(),
                    quantity: 1,
                    unit_price: Price::from_minor_units(120_000, CurrencyCode::USD),
                },
                OrderItem {
                    id: OrderItemId::new("itm_2"),
                    sku: "NK-204".to_string(),
                    name: "Pearl necklace".to_string(),
                    quantity: 1,
                    unit_price: Price::from_minor_units(45_000, CurrencyCode::USD),
                },
            ],
            created_at: now() - Duration::days(10),
        }
    }

    fn request(sku: &str, status: ReturnRequestStatus) -> ReturnRequest {
        ReturnRequest {
            id: ReturnRequestId::new(format!("rr_{sku}")),
            order_id: OrderId::new("ord_1"),
            item_sku: sku.to_string(),
            status,
            reason: None,
            created_at: now() - Duration::days(1),
            updated_at: None,
        }
    }

    #[test]
    fn test_view_for_delivered_order_with_open_return() {
        let order = order(OrderStatus::Delivered, 3);
        let requests = [request("RG-001", ReturnRequestStatus::Processing)];

        let view = build_timeline_view(&order, &requests, FetchPhase::Done, now());

        assert_eq!(view.timeline.projection.stages.len(), 6);
        assert_eq!(view.timeline.projection.current_index, 5);
        assert_eq!(view.timeline.connectors, vec![true; 5]);
        // The necklace can still be returned.
        assert!(view.return_eligible);
        assert_eq!(view.returns.len(), 1);
        assert_eq!(view.returns[0].item_name.as_deref(), Some("Solitaire ring"));
        assert_eq!(view.returns[0].item_total.as_deref(), Some("$1200.00"));
    }

    #[test]
    fn test_return_stays_visible_after_window_closes() {
        let order = order(OrderStatus::Delivered, 12);
        let requests = [request("RG-001", ReturnRequestStatus::Approved)];

        let view = build_timeline_view(&order, &requests, FetchPhase::Done, now());

        assert!(!view.return_eligible);
        assert!(view.timeline.projection.has_return_stage());
    }

    #[test]
    fn test_view_without_loaded_returns() {
        let order = order(OrderStatus::Shipped, 1);

        let view = build_timeline_view(&order, &[], FetchPhase::Failed, now());

        assert_eq!(view.timeline.projection.stages.len(), 5);
        assert_eq!(view.timeline.connectors, vec![true, true, true, false]);
        assert!(!view.return_eligible);
        assert_eq!(view.returns_phase, FetchPhase::Failed);
    }

    #[test]
    fn test_view_serializes_flattened_projection() {
        let order = order(OrderStatus::Processing, 1);
        let view = build_timeline_view(&order, &[], FetchPhase::Done, now());

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["order_status"], "processing");
        assert_eq!(json["timeline"]["current_index"], 2);
        assert_eq!(json["timeline"]["stages"][2]["key"], "processing");
        assert_eq!(json["timeline"]["stages"][2]["is_current"], true);
        assert_eq!(json["returns_phase"], "done");
    }

    #[test]
    fn test_blank_order_id_is_rejected() {
        assert!(matches!(
            parse_order_id("  ".to_string()),
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(parse_order_id("ord_1".to_string()).unwrap().as_str(), "ord_1");
    }
}
