//! Shared identifiers and value types for the order-processing core.

pub mod ids;
pub mod money;
pub mod order;

pub use ids::{CartId, CartItemId, CategoryId, OrderId, OrderItemId, ProductId, UserId};
pub use money::{MONEY_SCALE, line_total, round_money};
pub use order::{
    AddressError, OrderStatus, ParseStatusError, PaymentMethod, PaymentStatus, ShippingAddress,
};
