//! Atomic cart-to-order conversion.

use std::time::Instant;

use common::{
    OrderId, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress, UserId, line_total,
    round_money,
};
use rust_decimal::Decimal;
use store::{NewOrder, NewOrderItem, Store, Transaction, with_transaction};

use crate::error::{CommerceError, ErrorKind, Result};
use crate::inventory::InventoryLedger;

use super::Order;
use super::repository::load_order;

/// Converts a user's cart into an order in a single transaction.
///
/// Either every effect lands (stock decremented, order and items written,
/// cart emptied) or none does.
#[derive(Clone)]
pub struct OrderMaterializer<S> {
    store: S,
}

impl<S: Store> OrderMaterializer<S> {
    /// Creates a new materializer backed by the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Checks out the user's cart.
    ///
    /// The address is validated before any transaction opens. Stock is
    /// reserved in ascending product id order so that concurrent checkouts
    /// sharing products lock rows in the same order.
    #[tracing::instrument(skip(self, shipping_address))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        shipping_address: ShippingAddress,
    ) -> Result<Order> {
        shipping_address.validate()?;

        let started = Instant::now();
        let result = with_transaction(&self.store, move |tx| {
            Box::pin(materialize(tx, user_id, shipping_address))
        })
        .await;
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());

        let order_id = match result {
            Ok(order_id) => order_id,
            Err(e) => {
                metrics::counter!("checkout_failures_total", "reason" => e.reason()).increment(1);
                match e.kind() {
                    ErrorKind::Internal => {
                        tracing::error!(user_id = %user_id, error = %e, "checkout failed")
                    }
                    _ => tracing::warn!(user_id = %user_id, error = %e, "checkout rejected"),
                }
                return Err(e);
            }
        };

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(user_id = %user_id, order_id = %order_id, "order created");

        with_transaction(&self.store, move |tx| Box::pin(load_order(tx, order_id)))
            .await?
            .ok_or(CommerceError::OrderNotFound(order_id))
    }
}

async fn materialize(
    tx: &mut Transaction,
    user_id: UserId,
    shipping_address: ShippingAddress,
) -> Result<OrderId> {
    // Locking the cart row first serializes checkouts and cart edits for
    // this user; a second checkout waits here and then finds the cart empty.
    let Some(cart) = tx.cart_for_user_for_update(user_id).await? else {
        return Err(CommerceError::EmptyCart);
    };

    let mut lines = tx.cart_lines(cart.id).await?;
    if lines.is_empty() {
        return Err(CommerceError::EmptyCart);
    }
    lines.sort_by_key(|line| line.product_id);

    let mut total = Decimal::ZERO;
    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        let product = InventoryLedger::reserve_stock(tx, line.product_id, line.quantity).await?;

        total += line_total(line.price_at_addition, line.quantity);
        items.push(NewOrderItem {
            product_id: line.product_id,
            product_name: product.name,
            quantity: line.quantity,
            price_at_purchase: line.price_at_addition,
        });
    }

    let order = tx
        .insert_order(NewOrder {
            user_id,
            total_amount: round_money(total),
            shipping_address,
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: PaymentStatus::Unpaid,
        })
        .await?;

    for item in items {
        tx.insert_order_item(order.id, item).await?;
    }

    tx.clear_cart_items(cart.id).await?;

    Ok(order.id)
}
