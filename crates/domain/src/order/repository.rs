//! Order reads and status changes.

use common::{OrderId, OrderStatus, UserId};
use store::{OrderFilter, Store, Transaction, with_transaction};

use crate::error::{CommerceError, Result};

use super::Order;

/// Durable storage and retrieval of orders.
///
/// User-scoped reads treat an order owned by someone else exactly like a
/// missing one.
#[derive(Clone)]
pub struct OrderRepository<S> {
    store: S,
}

impl<S: Store> OrderRepository<S> {
    /// Creates a new repository backed by the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads an order owned by `user_id`.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_for_user(&self, order_id: OrderId, user_id: UserId) -> Result<Order> {
        let order = self.get(order_id).await?;
        match order {
            Some(order) if order.user_id == user_id => Ok(order),
            _ => Err(CommerceError::OrderNotFound(order_id)),
        }
    }

    /// Lists the user's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        self.list(OrderFilter::for_user(user_id)).await
    }

    /// Loads any order regardless of owner.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_for_admin(&self, order_id: OrderId) -> Result<Order> {
        self.get(order_id)
            .await?
            .ok_or(CommerceError::OrderNotFound(order_id))
    }

    /// Lists every order, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_all_orders_for_admin(&self) -> Result<Vec<Order>> {
        self.list(OrderFilter::all()).await
    }

    /// Sets an order's status.
    ///
    /// Any status may follow any other; only the value itself is validated.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(&self, order_id: OrderId, status: &str) -> Result<Order> {
        let status: OrderStatus = status.parse()?;

        let order = with_transaction(&self.store, move |tx| {
            Box::pin(async move {
                tx.update_order_status(order_id, status)
                    .await?
                    .ok_or(CommerceError::OrderNotFound(order_id))?;
                load_order(tx, order_id)
                    .await?
                    .ok_or(CommerceError::OrderNotFound(order_id))
            })
        })
        .await?;

        metrics::counter!("order_status_updates_total", "status" => status.as_str()).increment(1);
        tracing::info!(order_id = %order_id, status = %status, "order status updated");

        Ok(order)
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        with_transaction(&self.store, move |tx| Box::pin(load_order(tx, order_id))).await
    }

    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        with_transaction(&self.store, move |tx| {
            Box::pin(async move {
                let records = tx.list_orders(filter).await?;
                let mut orders = Vec::with_capacity(records.len());
                for record in records {
                    let items = tx.order_items(record.id).await?;
                    orders.push(Order::new(record, items));
                }
                Ok(orders)
            })
        })
        .await
    }
}

/// Reads an order and its items inside an open transaction.
pub(crate) async fn load_order(tx: &mut Transaction, order_id: OrderId) -> Result<Option<Order>> {
    let Some(record) = tx.order(order_id).await? else {
        return Ok(None);
    };
    let items = tx.order_items(order_id).await?;
    Ok(Some(Order::new(record, items)))
}
