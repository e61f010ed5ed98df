//! Authoritative stock accounting.

use common::ProductId;
use store::{Product, Transaction};

use crate::error::{CommerceError, Result};

/// The only component allowed to decrement stock for a sale.
///
/// Stateless: every operation runs inside a transaction owned by the caller
/// and never commits it.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryLedger;

impl InventoryLedger {
    /// Locks the product row, checks availability and writes back the
    /// decremented stock.
    ///
    /// The row lock is held until the surrounding transaction ends, so a
    /// concurrent reservation of the same product waits here and then sees
    /// the decremented count. Returns the product as it was before the
    /// decrement.
    #[tracing::instrument(skip(tx))]
    pub async fn reserve_stock(
        tx: &mut Transaction,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Product> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity { quantity });
        }

        let product = tx
            .product_for_update(product_id)
            .await?
            .ok_or(CommerceError::ProductNotFound(product_id))?;

        if product.stock_quantity < quantity {
            return Err(CommerceError::OutOfStock {
                product_id,
                product_name: product.name,
                available: product.stock_quantity,
                requested: quantity,
            });
        }

        tx.set_stock_quantity(product_id, product.stock_quantity - quantity)
            .await?;

        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use store::{InMemoryStore, NewProduct, Store};

    use super::*;

    async fn store_with_product(stock: i32) -> (InMemoryStore, ProductId) {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let product = tx
            .insert_product(NewProduct::new("Widget", dec!(4.00), stock))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        (store, product.id)
    }

    async fn stock_of(store: &InMemoryStore, id: ProductId) -> i32 {
        let mut tx = store.begin().await.unwrap();
        tx.product(id).await.unwrap().unwrap().stock_quantity
    }

    #[tokio::test]
    async fn reserve_decrements_within_transaction() {
        let (store, id) = store_with_product(5).await;

        let mut tx = store.begin().await.unwrap();
        let before = InventoryLedger::reserve_stock(&mut tx, id, 5).await.unwrap();
        assert_eq!(before.stock_quantity, 5);
        assert_eq!(tx.product(id).await.unwrap().unwrap().stock_quantity, 0);
        tx.commit().await.unwrap();

        assert_eq!(stock_of(&store, id).await, 0);
    }

    #[tokio::test]
    async fn reserve_does_not_commit() {
        let (store, id) = store_with_product(5).await;

        {
            let mut tx = store.begin().await.unwrap();
            InventoryLedger::reserve_stock(&mut tx, id, 2).await.unwrap();
        }

        assert_eq!(stock_of(&store, id).await, 5);
    }

    #[tokio::test]
    async fn insufficient_stock_is_rejected_untouched() {
        let (store, id) = store_with_product(3).await;

        let mut tx = store.begin().await.unwrap();
        let err = InventoryLedger::reserve_stock(&mut tx, id, 5)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CommerceError::OutOfStock {
                available: 3,
                requested: 5,
                ..
            }
        ));
        assert_eq!(tx.product(id).await.unwrap().unwrap().stock_quantity, 3);
    }

    #[tokio::test]
    async fn missing_product_is_reported() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let err = InventoryLedger::reserve_stock(&mut tx, ProductId::new(9), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::ProductNotFound(id) if id == ProductId::new(9)));
    }
}
