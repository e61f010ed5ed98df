use chrono::{DateTime, Utc};
use common::{
    OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, ShippingAddress,
    UserId, line_total,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use store::{OrderItemRecord, OrderRecord};

/// A purchased line. Name and price are frozen at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Purchase price times quantity.
    pub fn line_total(&self) -> Decimal {
        line_total(self.price_at_purchase, self.quantity)
    }
}

impl From<OrderItemRecord> for OrderItem {
    fn from(record: OrderItemRecord) -> Self {
        Self {
            id: record.id,
            product_id: record.product_id,
            product_name: record.product_name,
            quantity: record.quantity,
            price_at_purchase: record.price_at_purchase,
            created_at: record.created_at,
        }
    }
}

/// An order with its items.
///
/// Everything except `status`, `payment_status` and `updated_at` is fixed at
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_amount: Decimal,
    pub shipping_address: ShippingAddress,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(record: OrderRecord, items: Vec<OrderItemRecord>) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            total_amount: record.total_amount,
            shipping_address: record.shipping_address,
            status: record.status,
            payment_method: record.payment_method,
            payment_status: record.payment_status,
            items: items.into_iter().map(OrderItem::from).collect(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    /// Total number of units across all items.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|item| i64::from(item.quantity)).sum()
    }
}
