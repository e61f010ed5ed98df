use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use common::{
    CartId, CartItemId, CategoryId, OrderId, OrderItemId, OrderStatus, ProductId,
    ShippingAddress, UserId,
};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row};

use crate::{
    CartItemRecord, CartLine, CartRecord, NewCartItem, NewOrder, NewOrderItem, NewProduct,
    OrderFilter, OrderItemRecord, OrderRecord, Product, ProductChanges, Result, StoreError,
    store::{Store, StoreTx, Transaction},
};

/// Sets a statement timeout that only lasts until the transaction ends.
const SET_STATEMENT_TIMEOUT_SQL: &str = "SELECT set_config('statement_timeout', $1, true)";

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, stock_quantity, category_id, created_at, updated_at";
const CART_COLUMNS: &str = "id, user_id, created_at, updated_at";
const CART_ITEM_COLUMNS: &str =
    "id, cart_id, product_id, quantity, price_at_addition, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, user_id, total_amount, shipping_address, status, \
     payment_method, payment_status, created_at, updated_at";
const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, product_id, product_name, quantity, price_at_purchase, created_at";

/// Connection settings for [`PostgresStore::connect`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// How long to wait for a free connection before failing.
    pub acquire_timeout: Duration,
    /// Per-statement limit applied to every transaction, if set.
    pub statement_timeout: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            statement_timeout: None,
        }
    }
}

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    statement_timeout: Option<Duration>,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            statement_timeout: None,
        }
    }

    /// Opens a connection pool and wraps it.
    pub async fn connect(database_url: &str, config: &StoreConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(database_url)
            .await?;

        Ok(Self {
            pool,
            statement_timeout: config.statement_timeout,
        })
    }

    /// Applies a statement timeout to every transaction opened by this store.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Transaction> {
        let mut tx = self.pool.begin().await?;

        if let Some(timeout) = self.statement_timeout {
            sqlx::query(SET_STATEMENT_TIMEOUT_SQL)
                .bind(format!("{}ms", timeout.as_millis()))
                .execute(&mut *tx)
                .await?;
        }

        Ok(Box::new(PgStoreTx { tx }))
    }
}

/// An open PostgreSQL transaction.
///
/// Dropping it without committing rolls back and returns the connection to
/// the pool.
struct PgStoreTx {
    tx: sqlx::Transaction<'static, Postgres>,
}

fn parse_column<T>(row: &PgRow, column: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|e: T::Err| StoreError::Decode(format!("column {column}: {e}")))
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        stock_quantity: row.try_get("stock_quantity")?,
        category_id: row
            .try_get::<Option<i64>, _>("category_id")?
            .map(CategoryId::new),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_cart(row: &PgRow) -> Result<CartRecord> {
    Ok(CartRecord {
        id: CartId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_cart_item(row: &PgRow) -> Result<CartItemRecord> {
    Ok(CartItemRecord {
        id: CartItemId::new(row.try_get("id")?),
        cart_id: CartId::new(row.try_get("cart_id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        quantity: row.try_get("quantity")?,
        price_at_addition: row.try_get("price_at_addition")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_cart_line(row: &PgRow) -> Result<CartLine> {
    Ok(CartLine {
        id: CartItemId::new(row.try_get("id")?),
        cart_id: CartId::new(row.try_get("cart_id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        product_name: row.try_get("product_name")?,
        product_description: row.try_get("product_description")?,
        quantity: row.try_get("quantity")?,
        price_at_addition: row.try_get("price_at_addition")?,
        current_price: row.try_get("current_price")?,
        stock_quantity: row.try_get("stock_quantity")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order(row: &PgRow) -> Result<OrderRecord> {
    let Json(shipping_address) = row.try_get::<Json<ShippingAddress>, _>("shipping_address")?;

    Ok(OrderRecord {
        id: OrderId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        total_amount: row.try_get("total_amount")?,
        shipping_address,
        status: parse_column(row, "status")?,
        payment_method: parse_column(row, "payment_method")?,
        payment_status: parse_column(row, "payment_status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order_item(row: &PgRow) -> Result<OrderItemRecord> {
    Ok(OrderItemRecord {
        id: OrderItemId::new(row.try_get("id")?),
        order_id: OrderId::new(row.try_get("order_id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        product_name: row.try_get("product_name")?,
        quantity: row.try_get("quantity")?,
        price_at_purchase: row.try_get("price_at_purchase")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn insert_product(&mut self, product: NewProduct) -> Result<Product> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (name, description, price, stock_quantity, category_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock_quantity)
        .bind(product.category_id.map(i64::from))
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_product(&row)
    }

    async fn product(&mut self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn list_products(&mut self) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_product).collect()
    }

    async fn update_product(
        &mut self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Option<Product>> {
        if changes.is_empty() {
            return self.product(id).await;
        }

        let (set_category, category_id) = match changes.category_id {
            Some(category_id) => (true, category_id.map(i64::from)),
            None => (false, None),
        };

        let row = sqlx::query(&format!(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                stock_quantity = COALESCE($5, stock_quantity),
                category_id = CASE WHEN $6 THEN $7 ELSE category_id END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .bind(changes.name.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.price)
        .bind(changes.stock_quantity)
        .bind(set_category)
        .bind(category_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn set_stock_quantity(&mut self, id: ProductId, stock_quantity: i32) -> Result<()> {
        sqlx::query("UPDATE products SET stock_quantity = $2, updated_at = NOW() WHERE id = $1")
            .bind(id.as_i64())
            .bind(stock_quantity)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn product_is_ordered(&mut self, id: ProductId) -> Result<bool> {
        let ordered: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM order_items WHERE product_id = $1)")
                .bind(id.as_i64())
                .fetch_one(&mut *self.tx)
                .await?;

        Ok(ordered)
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<bool> {
        // cart_items rows go with it through ON DELETE CASCADE
        let rows_affected = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn cart_for_user(&mut self, user_id: UserId) -> Result<Option<CartRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1"
        ))
        .bind(user_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_cart).transpose()
    }

    async fn cart_for_user_for_update(&mut self, user_id: UserId) -> Result<Option<CartRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(user_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_cart).transpose()
    }

    async fn ensure_cart(&mut self, user_id: UserId) -> Result<CartRecord> {
        if let Some(cart) = self.cart_for_user_for_update(user_id).await? {
            return Ok(cart);
        }

        // A concurrent first request may insert between the read and here.
        sqlx::query("INSERT INTO carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id.as_i64())
            .execute(&mut *self.tx)
            .await?;

        let row = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(user_id.as_i64())
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_cart(&row)
    }

    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLine>> {
        let rows = sqlx::query(
            r#"
            SELECT ci.id, ci.cart_id, ci.product_id,
                   p.name AS product_name,
                   p.description AS product_description,
                   ci.quantity, ci.price_at_addition,
                   p.price AS current_price,
                   p.stock_quantity,
                   ci.created_at, ci.updated_at
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.created_at ASC, ci.id ASC
            "#,
        )
        .bind(cart_id.as_i64())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_cart_line).collect()
    }

    async fn cart_item(
        &mut self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<Option<CartItemRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE id = $1 AND cart_id = $2"
        ))
        .bind(item_id.as_i64())
        .bind(cart_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_cart_item).transpose()
    }

    async fn cart_item_for_product(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItemRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE cart_id = $1 AND product_id = $2"
        ))
        .bind(cart_id.as_i64())
        .bind(product_id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_cart_item).transpose()
    }

    async fn insert_cart_item(&mut self, item: NewCartItem) -> Result<CartItemRecord> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO cart_items (cart_id, product_id, quantity, price_at_addition)
            VALUES ($1, $2, $3, $4)
            RETURNING {CART_ITEM_COLUMNS}
            "#
        ))
        .bind(item.cart_id.as_i64())
        .bind(item.product_id.as_i64())
        .bind(item.quantity)
        .bind(item.price_at_addition)
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_cart_item(&row)
    }

    async fn update_cart_item(
        &mut self,
        item_id: CartItemId,
        quantity: i32,
        price_at_addition: Option<Decimal>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE cart_items
            SET quantity = $2,
                price_at_addition = COALESCE($3, price_at_addition),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(item_id.as_i64())
        .bind(quantity)
        .bind(price_at_addition)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_cart_item(&mut self, item_id: CartItemId) -> Result<u64> {
        let rows_affected = sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(item_id.as_i64())
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn clear_cart_items(&mut self, cart_id: CartId) -> Result<u64> {
        let rows_affected = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.as_i64())
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<OrderRecord> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (user_id, total_amount, shipping_address, status, payment_method, payment_status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.user_id.as_i64())
        .bind(order.total_amount)
        .bind(Json(order.shipping_address))
        .bind(order.status.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_order(&row)
    }

    async fn insert_order_item(
        &mut self,
        order_id: OrderId,
        item: NewOrderItem,
    ) -> Result<OrderItemRecord> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO order_items (order_id, product_id, product_name, quantity, price_at_purchase)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ORDER_ITEM_COLUMNS}
            "#
        ))
        .bind(order_id.as_i64())
        .bind(item.product_id.as_i64())
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.price_at_purchase)
        .fetch_one(&mut *self.tx)
        .await?;

        row_to_order_item(&row)
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn list_orders(&mut self, filter: OrderFilter) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE ($1::BIGINT IS NULL OR user_id = $1)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(filter.user_id.map(i64::from))
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_order).collect()
    }

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id ASC"
        ))
        .bind(order_id.as_i64())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_order_item).collect()
    }

    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .bind(status.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let PgStoreTx { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let PgStoreTx { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}
