use async_trait::async_trait;
use common::{CartId, CartItemId, OrderId, OrderStatus, ProductId, UserId};
use futures_util::future::BoxFuture;

use crate::{
    CartItemRecord, CartLine, CartRecord, NewCartItem, NewOrder, NewOrderItem, NewProduct,
    OrderFilter, OrderItemRecord, OrderRecord, Product, ProductChanges, Result, StoreError,
};

/// An open unit of work against the store.
pub type Transaction = Box<dyn StoreTx>;

/// Handle to a transactional store.
///
/// Implementations are cheap to clone and thread-safe; every service holds
/// its own clone instead of reaching for a global pool.
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a transaction.
    ///
    /// Dropping the returned transaction without calling
    /// [`StoreTx::commit`] rolls it back.
    async fn begin(&self) -> Result<Transaction>;
}

/// Row-level operations available inside a transaction.
///
/// Nothing is visible to other transactions until [`StoreTx::commit`].
#[async_trait]
pub trait StoreTx: Send {
    // -- products --

    /// Inserts a product.
    async fn insert_product(&mut self, product: NewProduct) -> Result<Product>;

    /// Reads a product without locking it.
    async fn product(&mut self, id: ProductId) -> Result<Option<Product>>;

    /// Reads a product and holds an exclusive row lock on it until the
    /// transaction ends.
    ///
    /// Concurrent callers that also lock the same product block until this
    /// transaction commits or rolls back.
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<Product>>;

    /// Lists every product, newest first.
    async fn list_products(&mut self) -> Result<Vec<Product>>;

    /// Applies a partial update. Returns `None` if the product does not exist.
    async fn update_product(
        &mut self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Option<Product>>;

    /// Overwrites the stock count of a product.
    async fn set_stock_quantity(&mut self, id: ProductId, stock_quantity: i32) -> Result<()>;

    /// Returns true if any order line references the product.
    async fn product_is_ordered(&mut self, id: ProductId) -> Result<bool>;

    /// Deletes a product and any cart items holding it.
    ///
    /// Returns false if the product did not exist.
    async fn delete_product(&mut self, id: ProductId) -> Result<bool>;

    // -- carts --

    /// Reads a user's cart, if one was ever created.
    async fn cart_for_user(&mut self, user_id: UserId) -> Result<Option<CartRecord>>;

    /// Reads a user's cart and holds an exclusive lock on the cart row until
    /// the transaction ends.
    ///
    /// Checkout takes this lock first, so a second checkout or a cart edit
    /// for the same user waits and then sees the drained cart.
    async fn cart_for_user_for_update(&mut self, user_id: UserId) -> Result<Option<CartRecord>>;

    /// Returns the user's cart, creating it if absent, and locks the cart row
    /// until the transaction ends.
    ///
    /// Safe against two first requests from the same user racing.
    async fn ensure_cart(&mut self, user_id: UserId) -> Result<CartRecord>;

    /// Lists a cart's items joined with their live product rows, oldest first.
    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLine>>;

    /// Reads an item only if it belongs to the given cart.
    async fn cart_item(
        &mut self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<Option<CartItemRecord>>;

    /// Reads the cart's item for a product, if any.
    async fn cart_item_for_product(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItemRecord>>;

    /// Inserts a cart item.
    async fn insert_cart_item(&mut self, item: NewCartItem) -> Result<CartItemRecord>;

    /// Sets an item's quantity and, when given, refreshes its price snapshot.
    async fn update_cart_item(
        &mut self,
        item_id: CartItemId,
        quantity: i32,
        price_at_addition: Option<rust_decimal::Decimal>,
    ) -> Result<()>;

    /// Deletes a cart item. Returns the number of rows removed.
    async fn delete_cart_item(&mut self, item_id: CartItemId) -> Result<u64>;

    /// Deletes every item in a cart, keeping the cart row.
    async fn clear_cart_items(&mut self, cart_id: CartId) -> Result<u64>;

    // -- orders --

    /// Inserts an order header.
    async fn insert_order(&mut self, order: NewOrder) -> Result<OrderRecord>;

    /// Inserts an order line.
    async fn insert_order_item(
        &mut self,
        order_id: OrderId,
        item: NewOrderItem,
    ) -> Result<OrderItemRecord>;

    /// Reads an order header.
    async fn order(&mut self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Lists order headers matching the filter, newest first.
    async fn list_orders(&mut self, filter: OrderFilter) -> Result<Vec<OrderRecord>>;

    /// Lists an order's lines in insertion order.
    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemRecord>>;

    /// Sets an order's status and bumps `updated_at`.
    ///
    /// Returns `None` if the order does not exist.
    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<OrderRecord>>;

    // -- lifecycle --

    /// Makes every change visible and releases held locks.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discards every change and releases held locks.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Runs `work` inside a transaction.
///
/// Commits when `work` returns `Ok` and rolls back when it returns `Err`.
/// If the returned future is dropped before completion (timeout or
/// cancellation) the transaction is dropped with it, which also rolls back.
/// The underlying connection is released on every path.
///
/// ```ignore
/// let stock = with_transaction(&store, move |tx| {
///     Box::pin(async move {
///         let product = tx.product_for_update(id).await?;
///         Ok::<_, StoreError>(product.map(|p| p.stock_quantity))
///     })
/// })
/// .await?;
/// ```
pub async fn with_transaction<S, T, E, F>(store: &S, work: F) -> std::result::Result<T, E>
where
    S: Store + ?Sized,
    E: From<StoreError>,
    F: for<'t> FnOnce(&'t mut Transaction) -> BoxFuture<'t, std::result::Result<T, E>>,
{
    let mut tx = store.begin().await?;

    match work(&mut tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = tx.rollback().await {
                tracing::warn!(error = %rollback_error, "transaction rollback failed");
            }
            Err(error)
        }
    }
}
