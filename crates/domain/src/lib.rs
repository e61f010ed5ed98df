//! Domain layer for the order-processing core.
//!
//! This crate provides:
//! - `InventoryLedger` for locked check-and-decrement of stock
//! - `CartService` for per-user basket mutations
//! - `OrderMaterializer` for the atomic cart-to-order transition
//! - `OrderRepository` and the `OrderService` facade for order reads and
//!   status changes
//! - `ProductCatalog` for product administration
//!
//! Every service holds an injected [`store::Store`] handle and no other
//! state.

pub mod cart;
pub mod catalog;
pub mod error;
pub mod identity;
pub mod inventory;
pub mod order;

pub use cart::{Cart, CartItem, CartService};
pub use catalog::ProductCatalog;
pub use error::{CommerceError, ErrorKind, Result};
pub use identity::Caller;
pub use inventory::InventoryLedger;
pub use order::{Order, OrderItem, OrderMaterializer, OrderRepository, OrderService};
