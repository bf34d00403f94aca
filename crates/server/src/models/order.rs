//! Order types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use onandhome_core::{OrderId, OrderItemId, OrderStatus, PaymentMethod, ProductId, UserId, Won};

/// An order row joined with its buyer.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    /// Buyer's login id.
    pub user_login_id: String,
    /// Buyer's display name.
    pub username: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub total_price: Won,
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub shipping_address: Option<String>,
    pub shipping_request: Option<String>,
    pub hidden: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order line.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    #[serde(skip_serializing)]
    pub order_id: OrderId,
    /// `None` once the product has been deleted.
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub order_price: Won,
    pub count: i32,
    pub thumbnail_image: Option<String>,
}

/// An order with its lines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub status_label: &'static str,
    pub order_items: Vec<OrderItem>,
}

impl OrderDetail {
    #[must_use]
    pub fn new(order: Order, order_items: Vec<OrderItem>) -> Self {
        Self {
            status_label: order.status.label(),
            order,
            order_items,
        }
    }
}

/// Tracking answer for `GET /api/orders/{id}/track`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTracking {
    pub order_id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub track: &'static str,
}

/// Shipping details entered at checkout.
#[derive(Debug, Clone, Default)]
pub struct ShippingInfo {
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub shipping_address: Option<String>,
    pub shipping_request: Option<String>,
}
