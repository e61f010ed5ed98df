//! Admin order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::OrderId;
use domain::Order;
use serde::Deserialize;
use store::Store;

use super::AppState;
use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::extract::JsonBody;

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// GET /admin/orders
#[tracing::instrument(skip(state))]
pub async fn list_orders<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_all_orders_for_admin(&caller).await?))
}

/// GET /admin/orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get_order<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(
        state.orders.get_order_for_admin(&caller, order_id).await?,
    ))
}

/// PUT /admin/orders/{id}/status
#[tracing::instrument(skip(state))]
pub async fn update_status<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    Path(order_id): Path<OrderId>,
    JsonBody(req): JsonBody<UpdateStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .orders
        .update_status(&caller, order_id, &req.status)
        .await?;
    Ok(Json(order))
}
