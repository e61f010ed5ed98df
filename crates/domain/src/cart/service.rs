//! Cart service providing basket mutations for a single user.

use common::{CartItemId, ProductId, UserId};
use store::{CartRecord, NewCartItem, Store, Transaction, with_transaction};

use crate::error::{CommerceError, Result};

use super::Cart;

/// Service for managing carts.
///
/// Every operation lazily creates the user's cart and returns the full cart
/// after the change. Stock checks here are advisory: they read without a
/// lock and only give early feedback. Checkout re-validates under lock.
#[derive(Clone)]
pub struct CartService<S> {
    store: S,
}

impl<S: Store> CartService<S> {
    /// Creates a new cart service backed by the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the user's cart, creating it if absent.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<Cart> {
        with_transaction(&self.store, move |tx| {
            Box::pin(async move {
                let cart = tx.ensure_cart(user_id).await?;
                load_cart(tx, cart).await
            })
        })
        .await
    }

    /// Adds `quantity` units of a product, merging with an existing line.
    ///
    /// Merging refreshes the line's price snapshot to the current price.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Cart> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity { quantity });
        }

        with_transaction(&self.store, move |tx| {
            Box::pin(async move {
                let cart = tx.ensure_cart(user_id).await?;
                let product = tx
                    .product(product_id)
                    .await?
                    .ok_or(CommerceError::ProductNotFound(product_id))?;
                let existing = tx.cart_item_for_product(cart.id, product_id).await?;

                let in_cart = existing.as_ref().map_or(0, |item| item.quantity);
                let wanted = in_cart
                    .checked_add(quantity)
                    .ok_or(CommerceError::InvalidQuantity { quantity })?;

                if product.stock_quantity < wanted {
                    return Err(CommerceError::OutOfStock {
                        product_id,
                        product_name: product.name,
                        available: product.stock_quantity,
                        requested: wanted,
                    });
                }

                match existing {
                    Some(item) => {
                        tx.update_cart_item(item.id, wanted, Some(product.price))
                            .await?;
                    }
                    None => {
                        tx.insert_cart_item(NewCartItem {
                            cart_id: cart.id,
                            product_id,
                            quantity,
                            price_at_addition: product.price,
                        })
                        .await?;
                    }
                }

                load_cart(tx, cart).await
            })
        })
        .await
    }

    /// Sets an item's quantity. Zero removes the item.
    ///
    /// The price snapshot is left as it was.
    #[tracing::instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<Cart> {
        if quantity < 0 {
            return Err(CommerceError::InvalidQuantity { quantity });
        }

        with_transaction(&self.store, move |tx| {
            Box::pin(async move {
                let cart = tx.ensure_cart(user_id).await?;
                let item = tx
                    .cart_item(cart.id, item_id)
                    .await?
                    .ok_or(CommerceError::ItemNotFound(item_id))?;

                if quantity == 0 {
                    tx.delete_cart_item(item.id).await?;
                    return load_cart(tx, cart).await;
                }

                let product = tx
                    .product(item.product_id)
                    .await?
                    .ok_or(CommerceError::ProductNotFound(item.product_id))?;

                if product.stock_quantity < quantity {
                    return Err(CommerceError::OutOfStock {
                        product_id: product.id,
                        product_name: product.name,
                        available: product.stock_quantity,
                        requested: quantity,
                    });
                }

                tx.update_cart_item(item.id, quantity, None).await?;
                load_cart(tx, cart).await
            })
        })
        .await
    }

    /// Removes an item from the user's cart.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<Cart> {
        with_transaction(&self.store, move |tx| {
            Box::pin(async move {
                let cart = tx.ensure_cart(user_id).await?;
                if tx.cart_item(cart.id, item_id).await?.is_none() {
                    return Err(CommerceError::ItemNotFound(item_id));
                }

                tx.delete_cart_item(item_id).await?;
                load_cart(tx, cart).await
            })
        })
        .await
    }

    /// Removes every item, keeping the cart itself.
    #[tracing::instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: UserId) -> Result<Cart> {
        with_transaction(&self.store, move |tx| {
            Box::pin(async move {
                let cart = tx.ensure_cart(user_id).await?;
                let removed = tx.clear_cart_items(cart.id).await?;
                tracing::debug!(cart_id = %cart.id, removed, "cart cleared");
                load_cart(tx, cart).await
            })
        })
        .await
    }
}

async fn load_cart(tx: &mut Transaction, cart: CartRecord) -> Result<Cart> {
    let lines = tx.cart_lines(cart.id).await?;
    Ok(Cart::new(cart, lines))
}
