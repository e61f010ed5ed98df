//! Product catalog: public reads, admin writes.

use common::ProductId;
use rust_decimal::Decimal;
use store::{NewProduct, Product, ProductChanges, Store, with_transaction};

use crate::error::{CommerceError, Result};
use crate::identity::Caller;

/// Service for managing catalog products.
///
/// Price edits only affect the live product row. Existing cart and order
/// snapshots keep the price they captured.
#[derive(Clone)]
pub struct ProductCatalog<S> {
    store: S,
}

impl<S: Store> ProductCatalog<S> {
    /// Creates a new catalog backed by the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds a product. Admin only.
    #[tracing::instrument(skip(self, product), fields(name = %product.name))]
    pub async fn add_product(&self, caller: &Caller, product: NewProduct) -> Result<Product> {
        caller.require_admin()?;
        validate_name(&product.name)?;
        validate_price(product.price)?;
        validate_stock(product.stock_quantity)?;

        let product = with_transaction(&self.store, move |tx| {
            Box::pin(async move { Ok::<_, CommerceError>(tx.insert_product(product).await?) })
        })
        .await?;

        tracing::info!(product_id = %product.id, "product added");
        Ok(product)
    }

    /// Loads a product.
    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        with_transaction(&self.store, move |tx| {
            Box::pin(async move {
                tx.product(id)
                    .await?
                    .ok_or(CommerceError::ProductNotFound(id))
            })
        })
        .await
    }

    /// Lists every product, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        with_transaction(&self.store, move |tx| {
            Box::pin(async move { Ok::<_, CommerceError>(tx.list_products().await?) })
        })
        .await
    }

    /// Applies a partial update. Admin only.
    ///
    /// Only the fields present in `changes` are validated and written; an
    /// empty change set returns the product unchanged.
    #[tracing::instrument(skip(self, changes))]
    pub async fn update_product(
        &self,
        caller: &Caller,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Product> {
        caller.require_admin()?;
        if let Some(name) = &changes.name {
            validate_name(name)?;
        }
        if let Some(price) = changes.price {
            validate_price(price)?;
        }
        if let Some(stock_quantity) = changes.stock_quantity {
            validate_stock(stock_quantity)?;
        }

        with_transaction(&self.store, move |tx| {
            Box::pin(async move {
                tx.update_product(id, &changes)
                    .await?
                    .ok_or(CommerceError::ProductNotFound(id))
            })
        })
        .await
    }

    /// Deletes a product and removes it from every cart. Admin only.
    ///
    /// Products referenced by orders are kept so order history stays intact.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, caller: &Caller, id: ProductId) -> Result<()> {
        caller.require_admin()?;

        with_transaction(&self.store, move |tx| {
            Box::pin(async move {
                if tx.product(id).await?.is_none() {
                    return Err(CommerceError::ProductNotFound(id));
                }
                if tx.product_is_ordered(id).await? {
                    return Err(CommerceError::ProductInUse(id));
                }
                tx.delete_product(id).await?;
                Ok(())
            })
        })
        .await?;

        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CommerceError::InvalidProduct(
            "name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(CommerceError::InvalidProduct(format!(
            "price must be greater than 0, got {price}"
        )));
    }
    if price.normalize().scale() > common::MONEY_SCALE {
        return Err(CommerceError::InvalidProduct(format!(
            "price must have at most {} decimal places, got {price}",
            common::MONEY_SCALE
        )));
    }
    Ok(())
}

fn validate_stock(stock_quantity: i32) -> Result<()> {
    if stock_quantity < 0 {
        return Err(CommerceError::InvalidProduct(format!(
            "stock quantity must not be negative, got {stock_quantity}"
        )));
    }
    Ok(())
}
