//! Order records as persisted by the order store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::address::ShippingAddress;
use super::id::{OrderId, ProductId, UserId};
use super::payment::PaymentMethod;
use super::price::Money;
use super::status::OrderStatus;

/// One priced line of an order.
///
/// The unit price is frozen when the line is snapshotted and is never
/// re-read from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderLine {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// Derived money amounts of a cart or order.
///
/// `total == subtotal + shipping + tax` always holds for values produced by
/// the pricing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
}

/// A submitted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(flatten)]
    pub totals: OrderTotals,
    #[serde(default)]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_line_total() {
        let line = OrderLine {
            product_id: ProductId::new("p1"),
            name: "Coffee Maker".to_string(),
            unit_price: Money::new(dec!(149.99)),
            quantity: 3,
        };
        assert_eq!(line.line_total(), Money::new(dec!(449.97)));
    }

    #[test]
    fn test_order_document_shape() {
        let json = r#"{
            "id": "o1",
            "userId": "u1",
            "lines": [{"productId": "p1", "name": "Mug", "unitPrice": "5.00", "quantity": 2}],
            "shippingAddress": {
                "fullName": "A", "street": "B", "city": "C", "region": "D",
                "postalCode": "E", "country": "F", "phone": "G"
            },
            "paymentMethod": "paypal",
            "subtotal": "10.00",
            "shipping": "9.99",
            "tax": "0",
            "total": "19.99",
            "status": "Shipped",
            "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-02T00:00:00Z"
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.totals.total, Money::new(dec!(19.99)));
        assert_eq!(order.item_count(), 2);
        assert_eq!(order.payment_method, PaymentMethod::PayPal);
    }
}
