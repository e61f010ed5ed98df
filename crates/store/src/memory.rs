use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CartId, CartItemId, OrderId, OrderItemId, OrderStatus, ProductId, UserId};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    CartItemRecord, CartLine, CartRecord, NewCartItem, NewOrder, NewOrderItem, NewProduct,
    OrderFilter, OrderItemRecord, OrderRecord, Product, ProductChanges, Result,
    store::{Store, StoreTx, Transaction},
};

/// Per-table key counters, mirroring `BIGSERIAL`.
#[derive(Debug, Clone, Default)]
struct Sequences {
    products: i64,
    carts: i64,
    cart_items: i64,
    orders: i64,
    order_items: i64,
}

fn next(sequence: &mut i64) -> i64 {
    *sequence += 1;
    *sequence
}

#[derive(Debug, Clone, Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    carts: BTreeMap<CartId, CartRecord>,
    cart_items: BTreeMap<CartItemId, CartItemRecord>,
    orders: BTreeMap<OrderId, OrderRecord>,
    order_items: BTreeMap<OrderItemId, OrderItemRecord>,
    sequences: Sequences,
}

/// In-memory store implementation for testing.
///
/// A transaction holds the store-wide lock from `begin` until it commits or
/// is dropped, and works on a private copy of every table. Transactions are
/// therefore fully serialized, which is stricter than the row locks the
/// PostgreSQL store takes. Every `begin` copies all tables, so this store
/// is meant for tests and local development only.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    /// Returns the number of committed order lines.
    pub async fn order_item_count(&self) -> usize {
        self.tables.lock().await.order_items.len()
    }

    /// Clears every table.
    pub async fn clear(&self) {
        *self.tables.lock().await = Tables::default();
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Transaction> {
        let committed = Arc::clone(&self.tables).lock_owned().await;
        let working = committed.clone();

        Ok(Box::new(InMemoryTx { committed, working }))
    }
}

struct InMemoryTx {
    committed: OwnedMutexGuard<Tables>,
    working: Tables,
}

fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, i64)) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn insert_product(&mut self, product: NewProduct) -> Result<Product> {
        let now = Utc::now();
        let id = ProductId::new(next(&mut self.working.sequences.products));
        let record = Product {
            id,
            name: product.name,
            description: product.description,
            price: product.price,
            stock_quantity: product.stock_quantity,
            category_id: product.category_id,
            created_at: now,
            updated_at: now,
        };

        self.working.products.insert(id, record.clone());
        Ok(record)
    }

    async fn product(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<Product>> {
        // The transaction already holds the store-wide lock.
        Ok(self.working.products.get(&id).cloned())
    }

    async fn list_products(&mut self) -> Result<Vec<Product>> {
        let mut products: Vec<_> = self.working.products.values().cloned().collect();
        newest_first(&mut products, |p| (p.created_at, p.id.as_i64()));
        Ok(products)
    }

    async fn update_product(
        &mut self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Option<Product>> {
        let Some(product) = self.working.products.get_mut(&id) else {
            return Ok(None);
        };

        if !changes.is_empty() {
            changes.apply_to(product);
            product.updated_at = Utc::now();
        }

        Ok(Some(product.clone()))
    }

    async fn set_stock_quantity(&mut self, id: ProductId, stock_quantity: i32) -> Result<()> {
        if let Some(product) = self.working.products.get_mut(&id) {
            product.stock_quantity = stock_quantity;
            product.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn product_is_ordered(&mut self, id: ProductId) -> Result<bool> {
        Ok(self
            .working
            .order_items
            .values()
            .any(|item| item.product_id == id))
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<bool> {
        if self.working.products.remove(&id).is_none() {
            return Ok(false);
        }
        self.working
            .cart_items
            .retain(|_, item| item.product_id != id);
        Ok(true)
    }

    async fn cart_for_user(&mut self, user_id: UserId) -> Result<Option<CartRecord>> {
        Ok(self
            .working
            .carts
            .values()
            .find(|cart| cart.user_id == user_id)
            .cloned())
    }

    async fn cart_for_user_for_update(&mut self, user_id: UserId) -> Result<Option<CartRecord>> {
        // the transaction already holds the whole store
        self.cart_for_user(user_id).await
    }

    async fn ensure_cart(&mut self, user_id: UserId) -> Result<CartRecord> {
        if let Some(cart) = self.cart_for_user(user_id).await? {
            return Ok(cart);
        }

        let now = Utc::now();
        let id = CartId::new(next(&mut self.working.sequences.carts));
        let cart = CartRecord {
            id,
            user_id,
            created_at: now,
            updated_at: now,
        };

        self.working.carts.insert(id, cart.clone());
        Ok(cart)
    }

    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLine>> {
        let mut lines: Vec<CartLine> = self
            .working
            .cart_items
            .values()
            .filter(|item| item.cart_id == cart_id)
            .filter_map(|item| {
                let product = self.working.products.get(&item.product_id)?;
                Some(CartLine {
                    id: item.id,
                    cart_id: item.cart_id,
                    product_id: item.product_id,
                    product_name: product.name.clone(),
                    product_description: product.description.clone(),
                    quantity: item.quantity,
                    price_at_addition: item.price_at_addition,
                    current_price: product.price,
                    stock_quantity: product.stock_quantity,
                    created_at: item.created_at,
                    updated_at: item.updated_at,
                })
            })
            .collect();

        lines.sort_by_key(|line| (line.created_at, line.id));
        Ok(lines)
    }

    async fn cart_item(
        &mut self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<Option<CartItemRecord>> {
        Ok(self
            .working
            .cart_items
            .get(&item_id)
            .filter(|item| item.cart_id == cart_id)
            .cloned())
    }

    async fn cart_item_for_product(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItemRecord>> {
        Ok(self
            .working
            .cart_items
            .values()
            .find(|item| item.cart_id == cart_id && item.product_id == product_id)
            .cloned())
    }

    async fn insert_cart_item(&mut self, item: NewCartItem) -> Result<CartItemRecord> {
        let now = Utc::now();
        let id = CartItemId::new(next(&mut self.working.sequences.cart_items));
        let record = CartItemRecord {
            id,
            cart_id: item.cart_id,
            product_id: item.product_id,
            quantity: item.quantity,
            price_at_addition: item.price_at_addition,
            created_at: now,
            updated_at: now,
        };

        self.working.cart_items.insert(id, record.clone());
        Ok(record)
    }

    async fn update_cart_item(
        &mut self,
        item_id: CartItemId,
        quantity: i32,
        price_at_addition: Option<Decimal>,
    ) -> Result<()> {
        if let Some(item) = self.working.cart_items.get_mut(&item_id) {
            item.quantity = quantity;
            if let Some(price) = price_at_addition {
                item.price_at_addition = price;
            }
            item.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_cart_item(&mut self, item_id: CartItemId) -> Result<u64> {
        Ok(u64::from(self.working.cart_items.remove(&item_id).is_some()))
    }

    async fn clear_cart_items(&mut self, cart_id: CartId) -> Result<u64> {
        let before = self.working.cart_items.len();
        self.working
            .cart_items
            .retain(|_, item| item.cart_id != cart_id);
        Ok((before - self.working.cart_items.len()) as u64)
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<OrderRecord> {
        let now = Utc::now();
        let id = OrderId::new(next(&mut self.working.sequences.orders));
        let record = OrderRecord {
            id,
            user_id: order.user_id,
            total_amount: order.total_amount,
            shipping_address: order.shipping_address,
            status: order.status,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            created_at: now,
            updated_at: now,
        };

        self.working.orders.insert(id, record.clone());
        Ok(record)
    }

    async fn insert_order_item(
        &mut self,
        order_id: OrderId,
        item: NewOrderItem,
    ) -> Result<OrderItemRecord> {
        let id = OrderItemId::new(next(&mut self.working.sequences.order_items));
        let record = OrderItemRecord {
            id,
            order_id,
            product_id: item.product_id,
            product_name: item.product_name,
            quantity: item.quantity,
            price_at_purchase: item.price_at_purchase,
            created_at: Utc::now(),
        };

        self.working.order_items.insert(id, record.clone());
        Ok(record)
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn list_orders(&mut self, filter: OrderFilter) -> Result<Vec<OrderRecord>> {
        let mut orders: Vec<_> = self
            .working
            .orders
            .values()
            .filter(|order| filter.matches(order.user_id))
            .cloned()
            .collect();
        newest_first(&mut orders, |o| (o.created_at, o.id.as_i64()));
        Ok(orders)
    }

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        // BTreeMap iteration is already in id order.
        Ok(self
            .working
            .order_items
            .values()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<OrderRecord>> {
        Ok(self.working.orders.get_mut(&id).map(|order| {
            order.status = status;
            order.updated_at = Utc::now();
            order.clone()
        }))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTx {
            mut committed,
            working,
        } = *self;
        *committed = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        // Dropping the working copy discards every change.
        Ok(())
    }
}
