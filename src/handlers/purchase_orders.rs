use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::purchase_orders::CreatePurchaseOrderInput,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};

/// Create a purchase order, draft or directly confirmed
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    request_body = CreatePurchaseOrderInput,
    responses(
        (status = 201, description = "Purchase order created"),
        (status = 404, description = "Supplier or product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    Json(payload): Json<CreatePurchaseOrderInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let order = state
        .services
        .purchase_orders
        .create(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(order))
}

/// List purchase orders
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    responses((status = 200, description = "Purchase orders, newest first")),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state
        .services
        .purchase_orders
        .list()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(orders))
}

/// Aggregate procurement counters
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/stats",
    responses((status = 200, description = "Counts per status and total amount")),
    tag = "purchase-orders"
)]
pub async fn purchase_order_stats(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state
        .services
        .purchase_orders
        .stats()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(stats))
}

/// Get a purchase order with its items
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = i64, Path, description = "Purchase order id")),
    responses(
        (status = 200, description = "Purchase order"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .purchase_orders
        .get(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

/// Confirm a draft purchase order and derive its delivery
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/confirm",
    params(("id" = i64, Path, description = "Purchase order id")),
    responses(
        (status = 200, description = "Purchase order confirmed"),
        (status = 400, description = "Not in draft status", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn confirm_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .purchase_orders
        .confirm(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

/// Receive a confirmed purchase order, increasing stock
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/receive",
    params(("id" = i64, Path, description = "Purchase order id")),
    responses(
        (status = 200, description = "Purchase order received"),
        (status = 400, description = "Not in confirmed status", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn receive_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .purchase_orders
        .mark_received(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

/// Cancel a draft or confirmed purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/cancel",
    params(("id" = i64, Path, description = "Purchase order id")),
    responses(
        (status = 200, description = "Purchase order cancelled"),
        (status = 400, description = "Already received", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn cancel_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .purchase_orders
        .cancel(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_purchase_order))
        .route("/", get(list_purchase_orders))
        .route("/stats", get(purchase_order_stats))
        .route("/{id}", get(get_purchase_order))
        .route("/{id}/confirm", post(confirm_purchase_order))
        .route("/{id}/receive", post(receive_purchase_order))
        .route("/{id}/cancel", post(cancel_purchase_order))
}
