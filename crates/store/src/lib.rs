//! Transactional persistence for carts, orders and inventory.
//!
//! Services depend on the [`Store`] trait and receive a handle at
//! construction. Two implementations are provided: [`PostgresStore`] for
//! production and [`InMemoryStore`] for tests.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod records;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::{PostgresStore, StoreConfig};
pub use query::OrderFilter;
pub use records::{
    CartItemRecord, CartLine, CartRecord, NewCartItem, NewOrder, NewOrderItem, NewProduct,
    OrderItemRecord, OrderRecord, Product, ProductChanges,
};
pub use store::{Store, StoreTx, Transaction, with_transaction};
