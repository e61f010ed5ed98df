//! HTTP handlers. Each module translates JSON to a domain service call.

pub mod admin;
pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;

use domain::{CartService, OrderService, ProductCatalog};
use store::Store;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub store: S,
    pub carts: CartService<S>,
    pub orders: OrderService<S>,
    pub catalog: ProductCatalog<S>,
}

impl<S: Store + Clone> AppState<S> {
    /// Wires every service to the same store handle.
    pub fn new(store: S) -> Self {
        Self {
            carts: CartService::new(store.clone()),
            orders: OrderService::new(store.clone()),
            catalog: ProductCatalog::new(store.clone()),
            store,
        }
    }
}
