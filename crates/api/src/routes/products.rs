//! Catalog endpoints. Reads are public; writes need the admin role.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ProductId;
use store::{NewProduct, Product, ProductChanges, Store};

use super::AppState;
use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::extract::JsonBody;

/// GET /products
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog.list_products().await?))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.catalog.get_product(id).await?))
}

/// POST /products
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    JsonBody(req): JsonBody<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.catalog.add_product(&caller, req).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /products/{id}: only the fields present in the body change. An
/// explicit `"category_id": null` clears the category.
#[tracing::instrument(skip(state, changes))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<ProductId>,
    JsonBody(changes): JsonBody<ProductChanges>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(
        state.catalog.update_product(&caller, id, changes).await?,
    ))
}

/// DELETE /products/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_product(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
