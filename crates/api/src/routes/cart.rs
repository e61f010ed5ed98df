//! Cart endpoints. Every route acts on the caller's own cart.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{CartItemId, ProductId};
use domain::Cart;
use serde::Deserialize;
use store::Store;

use super::AppState;
use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::extract::JsonBody;

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

/// GET /cart
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
) -> Result<Json<Cart>, ApiError> {
    Ok(Json(state.carts.get_cart(caller.user_id).await?))
}

/// DELETE /cart: empties the cart and returns it.
#[tracing::instrument(skip(state))]
pub async fn clear<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
) -> Result<Json<Cart>, ApiError> {
    Ok(Json(state.carts.clear_cart(caller.user_id).await?))
}

/// POST /cart/items
#[tracing::instrument(skip(state))]
pub async fn add_item<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    JsonBody(req): JsonBody<AddItemRequest>,
) -> Result<Json<Cart>, ApiError> {
    let cart = state
        .carts
        .add_item(caller.user_id, req.product_id, req.quantity)
        .await?;
    Ok(Json(cart))
}

/// PUT /cart/items/{id}: a quantity of zero removes the item.
#[tracing::instrument(skip(state))]
pub async fn update_item<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    Path(item_id): Path<CartItemId>,
    JsonBody(req): JsonBody<UpdateItemRequest>,
) -> Result<Json<Cart>, ApiError> {
    let cart = state
        .carts
        .update_item_quantity(caller.user_id, item_id, req.quantity)
        .await?;
    Ok(Json(cart))
}

/// DELETE /cart/items/{id}
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    Path(item_id): Path<CartItemId>,
) -> Result<Json<Cart>, ApiError> {
    Ok(Json(state.carts.remove_item(caller.user_id, item_id).await?))
}
