use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    entities::sales_order::OrderStatus,
    errors::ApiError,
    handlers::AppState,
    services::orders::{CreateOrderInput, UpdateOrderStatusInput},
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};

/// Create an order directly from a line list
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderInput,
    responses(
        (status = 201, description = "Order created"),
        (status = 400, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let order = state
        .services
        .orders
        .create_order(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(order))
}

/// List orders
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses((status = 200, description = "Orders, newest first")),
    tag = "orders"
)]
pub async fn list_orders(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let orders = state
        .services
        .orders
        .list_orders()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(orders))
}

/// Get an order with its items
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_order(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

/// Move an order through its status state machine
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    params(("id" = i64, Path, description = "Order id")),
    request_body = UpdateOrderStatusInput,
    responses(
        (status = 200, description = "Order updated"),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateOrderStatusInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let status: OrderStatus = payload
        .status
        .parse()
        .map_err(ApiError::BadRequest)?;
    let order = state
        .services
        .orders
        .update_status(id, status)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/", get(list_orders))
        .route("/{id}", get(get_order))
        .route("/{id}/status", put(update_order_status))
}
