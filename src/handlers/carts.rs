use super::common::{created_response, map_service_error, no_content_response, success_response, validate_input};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::carts::{AddItemInput, UpdateItemInput},
    services::orders::CheckoutInput,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct RestoreStockParams {
    /// Whether removed quantities flow back into product stock.
    #[serde(default = "default_restore")]
    pub restore_stock: bool,
}

fn default_restore() -> bool {
    true
}

/// Get the customer's cart
#[utoipa::path(
    get,
    path = "/api/v1/carts/{customer_id}",
    params(("customer_id" = i64, Path, description = "Customer id")),
    responses((status = 200, description = "Cart with items and totals")),
    tag = "carts"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .carts
        .get_cart(customer_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

/// Add a product to the cart, reserving stock
#[utoipa::path(
    post,
    path = "/api/v1/carts/{customer_id}/items",
    params(("customer_id" = i64, Path, description = "Customer id")),
    request_body = AddItemInput,
    responses(
        (status = 200, description = "Updated cart"),
        (status = 400, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "carts"
)]
pub async fn add_item(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
    Json(payload): Json<AddItemInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let cart = state
        .services
        .carts
        .add_item(customer_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

/// Set a cart line to an absolute quantity
#[utoipa::path(
    put,
    path = "/api/v1/carts/{customer_id}/items/{product_id}",
    params(
        ("customer_id" = i64, Path, description = "Customer id"),
        ("product_id" = i64, Path, description = "Product id")
    ),
    request_body = UpdateItemInput,
    responses(
        (status = 200, description = "Updated cart"),
        (status = 400, description = "Insufficient stock for the increase", body = crate::errors::ErrorResponse)
    ),
    tag = "carts"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path((customer_id, product_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateItemInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let cart = state
        .services
        .carts
        .update_item(customer_id, product_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

/// Remove a cart line
#[utoipa::path(
    delete,
    path = "/api/v1/carts/{customer_id}/items/{product_id}",
    params(
        ("customer_id" = i64, Path, description = "Customer id"),
        ("product_id" = i64, Path, description = "Product id"),
        RestoreStockParams
    ),
    responses((status = 200, description = "Updated cart")),
    tag = "carts"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    Path((customer_id, product_id)): Path<(i64, i64)>,
    Query(params): Query<RestoreStockParams>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .carts
        .remove_item(customer_id, product_id, params.restore_stock)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

/// Empty the cart
#[utoipa::path(
    delete,
    path = "/api/v1/carts/{customer_id}",
    params(
        ("customer_id" = i64, Path, description = "Customer id"),
        RestoreStockParams
    ),
    responses((status = 204, description = "Cart emptied")),
    tag = "carts"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
    Query(params): Query<RestoreStockParams>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .carts
        .clear(customer_id, params.restore_stock)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

/// Convert the cart into an order
#[utoipa::path(
    post,
    path = "/api/v1/carts/{customer_id}/checkout",
    params(("customer_id" = i64, Path, description = "Customer id")),
    request_body = CheckoutInput,
    responses(
        (status = 201, description = "Order created from cart"),
        (status = 400, description = "Cart is empty", body = crate::errors::ErrorResponse)
    ),
    tag = "carts"
)]
pub async fn checkout(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
    Json(payload): Json<CheckoutInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let order = state
        .services
        .orders
        .checkout(customer_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(order))
}

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/{customer_id}", get(get_cart))
        .route("/{customer_id}", delete(clear_cart))
        .route("/{customer_id}/items", post(add_item))
        .route("/{customer_id}/items/{product_id}", put(update_item))
        .route("/{customer_id}/items/{product_id}", delete(remove_item))
        .route("/{customer_id}/checkout", post(checkout))
}
