//! Order and return request read models.
//!
//! These mirror the documents stored by the order service. Only the fields
//! the storefront reads are modelled; unknown document fields are ignored.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{OrderId, OrderItemId, ReturnRequestId};
use super::price::Price;
use super::status::{OrderStatus, PaymentStatus, ReturnRequestStatus};

/// A line item on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    /// Stock keeping unit, also the key return requests refer to.
    pub sku: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Price,
}

impl OrderItem {
    /// Unit price multiplied by quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// A customer purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Cancelled orders show no delivery timeline.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.order_status == OrderStatus::Cancelled
    }

    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// Find a line item by SKU.
    #[must_use]
    pub fn item_by_sku(&self, sku: &str) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.sku == sku)
    }

    /// Sum of all line totals.
    ///
    /// Returns `None` for an order without items or with items priced in
    /// more than one currency.
    #[must_use]
    pub fn subtotal(&self) -> Option<Price> {
        let currency = self.items.first()?.unit_price.currency_code;
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| {
                let line = item.line_total();
                (line.currency_code == currency).then(|| acc + line.amount)
            })
            .map(|amount| Price::new(amount, currency))
    }
}

/// A customer request to return one line item of an order.
///
/// Return requests are never deleted, only moved through their lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    pub id: ReturnRequestId,
    pub order_id: OrderId,
    pub item_sku: String,
    pub status: ReturnRequestStatus,
    #[serde(default)]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::price::CurrencyCode;

    fn item(sku: &str, cents: i64, quantity: u32, currency: CurrencyCode) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(format!("item-{sku}")),
            sku: sku.to_string(),
            name: format!("Ring {sku}"),
            quantity,
            unit_price: Price::from_minor_units(cents, currency),
        }
    }

    fn order(items: Vec<OrderItem>) -> Order {
        Order {
            id: OrderId::new("ord_1"),
            order_status: OrderStatus::Delivered,
            payment_status: PaymentStatus::Paid,
            paid_at: None,
            items,
            created_at: DateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_subtotal_sums_line_totals() {
        let order = order(vec![
            item("RG-001", 10_000, 2, CurrencyCode::USD),
            item("NK-204", 4_550, 1, CurrencyCode::USD),
        ]);
        let subtotal = order.subtotal().unwrap();
        assert_eq!(subtotal.amount, Decimal::new(24_550, 2));
        assert_eq!(subtotal.currency_code, CurrencyCode::USD);
    }

    #[test]
    fn test_subtotal_mixed_currency_is_none() {
        let order = order(vec![
            item("RG-001", 10_000, 1, CurrencyCode::USD),
            item("NK-204", 4_550, 1, CurrencyCode::EUR),
        ]);
        assert!(order.subtotal().is_none());
        assert!(Order { items: vec![], ..order }.subtotal().is_none());
    }

    #[test]
    fn test_order_decodes_camel_case_document() {
        let json = r#"{
            "id": "665f1c2e9b1d4a0012ab34cd",
            "orderStatus": "shipped",
            "paymentStatus": "paid",
            "paidAt": "2026-10-01T12:00:00Z",
            "items": [{
                "id": "itm_1",
                "sku": "ER-310",
                "name": "Pearl drop earrings",
                "quantity": 1,
                "unitPrice": { "amount": "189.00", "currency_code": "USD" }
            }],
            "createdAt": "2026-09-30T08:15:00Z",
            "shippingAddress": { "city": "Jaipur" }
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.order_status, OrderStatus::Shipped);
        assert!(order.is_paid());
        assert!(order.item_by_sku("ER-310").is_some());
        assert!(order.item_by_sku("missing").is_none());
    }
}
