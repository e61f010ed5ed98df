//! Order service providing the caller-facing API for orders.

use common::{OrderId, ShippingAddress};
use store::Store;

use crate::error::Result;
use crate::identity::Caller;

use super::{Order, OrderMaterializer, OrderRepository};

/// Service for placing and managing orders.
///
/// Wraps the materializer and repository and applies role checks. Customer
/// operations are scoped to the caller's own orders; admin operations fail
/// with `Forbidden` for non-admins.
#[derive(Clone)]
pub struct OrderService<S> {
    materializer: OrderMaterializer<S>,
    repository: OrderRepository<S>,
}

impl<S: Store + Clone> OrderService<S> {
    /// Creates a new order service backed by the given store.
    pub fn new(store: S) -> Self {
        Self {
            materializer: OrderMaterializer::new(store.clone()),
            repository: OrderRepository::new(store),
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repository(&self) -> &OrderRepository<S> {
        &self.repository
    }

    /// Checks out the caller's cart.
    pub async fn create_order(
        &self,
        caller: &Caller,
        shipping_address: ShippingAddress,
    ) -> Result<Order> {
        self.materializer
            .create_order(caller.user_id, shipping_address)
            .await
    }

    /// Loads one of the caller's orders.
    pub async fn get_order(&self, caller: &Caller, order_id: OrderId) -> Result<Order> {
        self.repository
            .get_order_for_user(order_id, caller.user_id)
            .await
    }

    /// Lists the caller's orders, newest first.
    pub async fn list_orders(&self, caller: &Caller) -> Result<Vec<Order>> {
        self.repository.list_orders_for_user(caller.user_id).await
    }

    /// Loads any order. Admin only.
    pub async fn get_order_for_admin(&self, caller: &Caller, order_id: OrderId) -> Result<Order> {
        caller.require_admin()?;
        self.repository.get_order_for_admin(order_id).await
    }

    /// Lists every order, newest first. Admin only.
    pub async fn list_all_orders_for_admin(&self, caller: &Caller) -> Result<Vec<Order>> {
        caller.require_admin()?;
        self.repository.list_all_orders_for_admin().await
    }

    /// Changes an order's status. Admin only.
    pub async fn update_status(
        &self,
        caller: &Caller,
        order_id: OrderId,
        status: &str,
    ) -> Result<Order> {
        caller.require_admin()?;
        self.repository.update_status(order_id, status).await
    }
}
