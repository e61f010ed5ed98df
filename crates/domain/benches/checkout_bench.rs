use common::{ShippingAddress, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Caller, CartService, OrderService, ProductCatalog};
use rust_decimal_macros::dec;
use store::{InMemoryStore, NewProduct};

fn address() -> ShippingAddress {
    ShippingAddress::new("1 Main St", "Springfield", "12345", "US")
}

fn bench_add_item(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();
    let catalog = ProductCatalog::new(store.clone());
    let carts = CartService::new(store);
    let product = rt.block_on(async {
        catalog
            .add_product(
                &Caller::admin(UserId::new(1)),
                NewProduct::new("Widget", dec!(1.00), i32::MAX),
            )
            .await
            .unwrap()
    });

    let mut user = 0;
    c.bench_function("cart/add_item", |b| {
        b.iter(|| {
            user += 1;
            rt.block_on(async {
                carts
                    .add_item(UserId::new(user), product.id, 1)
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_checkout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("order/checkout_three_items", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryStore::new();
                let catalog = ProductCatalog::new(store.clone());
                let carts = CartService::new(store.clone());
                let orders = OrderService::new(store);
                let admin = Caller::admin(UserId::new(1));
                let caller = Caller::customer(UserId::new(2));

                for (name, price) in [("A", dec!(1.50)), ("B", dec!(2.25)), ("C", dec!(9.99))] {
                    let product = catalog
                        .add_product(&admin, NewProduct::new(name, price, 100))
                        .await
                        .unwrap();
                    carts.add_item(caller.user_id, product.id, 2).await.unwrap();
                }

                orders.create_order(&caller, address()).await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_add_item, bench_checkout);
criterion_main!(benches);
