//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;
use std::time::Duration;

use common::{
    CategoryId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, ShippingAddress, UserId,
};
use rust_decimal_macros::dec;
use serial_test::serial;
use sqlx::PgPool;
use store::{
    NewCartItem, NewOrder, NewOrderItem, NewProduct, OrderFilter, PostgresStore, ProductChanges,
    Store, StoreError, with_transaction,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_commerce_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE order_items, orders, cart_items, carts, products RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresStore::new(pool)
}

fn address() -> ShippingAddress {
    ShippingAddress::new("1 Main St", "Springfield", "12345", "US").with_state("IL")
}

#[tokio::test]
#[serial]
async fn insert_and_read_product() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let product = tx
        .insert_product(
            NewProduct::new("Widget", dec!(9.99), 5)
                .description("A widget")
                .category(CategoryId::new(7)),
        )
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let found = tx.product(product.id).await.unwrap().unwrap();
    assert_eq!(found.name, "Widget");
    assert_eq!(found.description, "A widget");
    assert_eq!(found.price, dec!(9.99));
    assert_eq!(found.stock_quantity, 5);
    assert_eq!(found.category_id, Some(CategoryId::new(7)));
}

#[tokio::test]
#[serial]
async fn uncommitted_changes_are_discarded() {
    let store = get_test_store().await;

    {
        let mut tx = store.begin().await.unwrap();
        tx.insert_product(NewProduct::new("Widget", dec!(9.99), 5))
            .await
            .unwrap();
        tx.rollback().await.unwrap();
    }

    let mut tx = store.begin().await.unwrap();
    assert!(tx.list_products().await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn partial_update_touches_only_present_fields() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let product = tx
        .insert_product(NewProduct::new("Widget", dec!(9.99), 5).category(CategoryId::new(7)))
        .await
        .unwrap();

    let updated = tx
        .update_product(product.id, &ProductChanges::new().price(dec!(12.50)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.price, dec!(12.50));
    assert_eq!(updated.name, "Widget");
    assert_eq!(updated.stock_quantity, 5);
    assert_eq!(updated.category_id, Some(CategoryId::new(7)));

    let cleared = tx
        .update_product(product.id, &ProductChanges::new().category_id(None))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cleared.category_id, None);
    assert_eq!(cleared.price, dec!(12.50));

    let missing = tx
        .update_product(ProductId::new(999), &ProductChanges::new().name("Nope"))
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
#[serial]
async fn negative_stock_is_rejected_by_constraint() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let product = tx
        .insert_product(NewProduct::new("Widget", dec!(9.99), 5))
        .await
        .unwrap();

    let result = tx.set_stock_quantity(product.id, -1).await;
    assert!(matches!(result, Err(StoreError::Database(_))));
}

#[tokio::test]
#[serial]
async fn ensure_cart_creates_once() {
    let store = get_test_store().await;
    let user = UserId::new(42);

    let mut tx = store.begin().await.unwrap();
    assert!(tx.cart_for_user(user).await.unwrap().is_none());
    let first = tx.ensure_cart(user).await.unwrap();
    let second = tx.ensure_cart(user).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(first.id, second.id);
}

#[tokio::test]
#[serial]
async fn concurrent_ensure_cart_yields_one_cart() {
    let store = get_test_store().await;
    let user = UserId::new(42);

    let mut handles = Vec::new();
    for _ in 0..5 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let mut tx = store.begin().await.unwrap();
            let cart = tx.ensure_cart(user).await.unwrap();
            tx.commit().await.unwrap();
            cart.id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
}

#[tokio::test]
#[serial]
async fn cart_lines_join_live_product_data() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let product = tx
        .insert_product(NewProduct::new("Widget", dec!(9.99), 5))
        .await
        .unwrap();
    let cart = tx.ensure_cart(UserId::new(1)).await.unwrap();
    let item = tx
        .insert_cart_item(NewCartItem {
            cart_id: cart.id,
            product_id: product.id,
            quantity: 2,
            price_at_addition: product.price,
        })
        .await
        .unwrap();
    tx.update_product(product.id, &ProductChanges::new().price(dec!(11.00)))
        .await
        .unwrap();

    let lines = tx.cart_lines(cart.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].id, item.id);
    assert_eq!(lines[0].price_at_addition, dec!(9.99));
    assert_eq!(lines[0].current_price, dec!(11.00));
    assert_eq!(lines[0].stock_quantity, 5);
    assert_eq!(lines[0].product_name, "Widget");
}

#[tokio::test]
#[serial]
async fn duplicate_cart_product_is_rejected() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let product = tx
        .insert_product(NewProduct::new("Widget", dec!(9.99), 5))
        .await
        .unwrap();
    let cart = tx.ensure_cart(UserId::new(1)).await.unwrap();
    let item = NewCartItem {
        cart_id: cart.id,
        product_id: product.id,
        quantity: 1,
        price_at_addition: product.price,
    };
    tx.insert_cart_item(item.clone()).await.unwrap();

    let result = tx.insert_cart_item(item).await;
    assert!(matches!(result, Err(StoreError::Database(_))));
}

#[tokio::test]
#[serial]
async fn order_round_trip_preserves_address_and_snapshots() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let product = tx
        .insert_product(NewProduct::new("Widget", dec!(9.99), 5))
        .await
        .unwrap();
    let order = tx
        .insert_order(NewOrder {
            user_id: UserId::new(1),
            total_amount: dec!(19.98),
            shipping_address: address(),
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: PaymentStatus::Unpaid,
        })
        .await
        .unwrap();
    tx.insert_order_item(
        order.id,
        NewOrderItem {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity: 2,
            price_at_purchase: product.price,
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.update_product(product.id, &ProductChanges::new().price(dec!(50.00)).name("Renamed"))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let stored = tx.order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.shipping_address, address());
    assert_eq!(stored.total_amount, dec!(19.98));
    assert_eq!(stored.payment_method, PaymentMethod::CashOnDelivery);
    assert_eq!(stored.payment_status, PaymentStatus::Unpaid);

    let items = tx.order_items(order.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].price_at_purchase, dec!(9.99));
    assert_eq!(items[0].product_name, "Widget");
    assert!(tx.product_is_ordered(product.id).await.unwrap());
}

#[tokio::test]
#[serial]
async fn orders_list_newest_first_per_user() {
    let store = get_test_store().await;
    let alice = UserId::new(1);
    let bob = UserId::new(2);

    let mut ids = Vec::new();
    for user in [alice, bob, alice] {
        let mut tx = store.begin().await.unwrap();
        let order = tx
            .insert_order(NewOrder {
                user_id: user,
                total_amount: dec!(1.00),
                shipping_address: address(),
                status: OrderStatus::Pending,
                payment_method: PaymentMethod::CashOnDelivery,
                payment_status: PaymentStatus::Unpaid,
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        ids.push(order.id);
    }

    let mut tx = store.begin().await.unwrap();
    let mine: Vec<_> = tx
        .list_orders(OrderFilter::for_user(alice))
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.id)
        .collect();
    assert_eq!(mine, vec![ids[2], ids[0]]);

    let all: Vec<_> = tx
        .list_orders(OrderFilter::all())
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.id)
        .collect();
    assert_eq!(all, vec![ids[2], ids[1], ids[0]]);
}

#[tokio::test]
#[serial]
async fn update_order_status_persists() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let order = tx
        .insert_order(NewOrder {
            user_id: UserId::new(1),
            total_amount: dec!(1.00),
            shipping_address: address(),
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: PaymentStatus::Unpaid,
        })
        .await
        .unwrap();
    let updated = tx
        .update_order_status(order.id, OrderStatus::Shipped)
        .await
        .unwrap()
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(updated.status, OrderStatus::Shipped);
    assert!(updated.updated_at >= order.updated_at);
}

#[tokio::test]
#[serial]
async fn delete_product_cascades_cart_items() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let product = tx
        .insert_product(NewProduct::new("Widget", dec!(9.99), 5))
        .await
        .unwrap();
    let cart = tx.ensure_cart(UserId::new(1)).await.unwrap();
    tx.insert_cart_item(NewCartItem {
        cart_id: cart.id,
        product_id: product.id,
        quantity: 1,
        price_at_addition: product.price,
    })
    .await
    .unwrap();

    assert!(tx.delete_product(product.id).await.unwrap());
    assert!(tx.cart_lines(cart.id).await.unwrap().is_empty());
    assert!(!tx.delete_product(product.id).await.unwrap());
}

#[tokio::test]
#[serial]
async fn row_lock_blocks_second_writer_until_commit() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let product = tx
        .insert_product(NewProduct::new("Widget", dec!(9.99), 5))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut holder = store.begin().await.unwrap();
    holder.product_for_update(product.id).await.unwrap();

    let contender = {
        let store = store.clone();
        let id = product.id;
        tokio::spawn(async move {
            with_transaction(&store, move |tx| {
                Box::pin(async move {
                    let locked = tx.product_for_update(id).await?;
                    Ok::<_, StoreError>(locked.map(|p| p.stock_quantity))
                })
            })
            .await
        })
    };

    // The contender cannot finish while the lock is held.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!contender.is_finished());

    holder.set_stock_quantity(product.id, 2).await.unwrap();
    holder.commit().await.unwrap();

    let seen = contender.await.unwrap().unwrap();
    assert_eq!(seen, Some(2));
}

#[tokio::test]
#[serial]
async fn cart_lock_blocks_ensure_cart_until_commit() {
    let store = get_test_store().await;
    let user = UserId::new(7);

    let mut tx = store.begin().await.unwrap();
    let product = tx
        .insert_product(NewProduct::new("Widget", dec!(9.99), 5))
        .await
        .unwrap();
    let cart = tx.ensure_cart(user).await.unwrap();
    tx.insert_cart_item(NewCartItem {
        cart_id: cart.id,
        product_id: product.id,
        quantity: 1,
        price_at_addition: product.price,
    })
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let mut holder = store.begin().await.unwrap();
    let locked = holder.cart_for_user_for_update(user).await.unwrap().unwrap();
    assert_eq!(locked.id, cart.id);

    let contender = {
        let store = store.clone();
        tokio::spawn(async move {
            with_transaction(&store, move |tx| {
                Box::pin(async move {
                    let cart = tx.ensure_cart(user).await?;
                    let lines = tx.cart_lines(cart.id).await?;
                    Ok::<_, StoreError>(lines.len())
                })
            })
            .await
        })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!contender.is_finished());

    holder.clear_cart_items(cart.id).await.unwrap();
    holder.commit().await.unwrap();

    // The waiter reads the cart as the holder left it.
    assert_eq!(contender.await.unwrap().unwrap(), 0);
}

#[tokio::test]
#[serial]
async fn statement_timeout_applies_inside_transactions() {
    let store = get_test_store()
        .await
        .with_statement_timeout(Duration::from_millis(100));

    let mut tx = store.begin().await.unwrap();
    let product = tx
        .insert_product(NewProduct::new("Widget", dec!(9.99), 5))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut holder = store.begin().await.unwrap();
    holder.product_for_update(product.id).await.unwrap();

    let mut waiter = store.begin().await.unwrap();
    let result = waiter.product_for_update(product.id).await;
    assert!(matches!(result, Err(StoreError::Database(_))));

    holder.rollback().await.unwrap();
}
