use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::products::CreateProductInput,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdjustStockRequest {
    /// Relative change, positive or negative.
    pub delta: i32,
    #[validate(length(min = 1))]
    pub reason: String,
}

/// Register a product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created"),
        (status = 409, description = "Reference already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let product = state
        .services
        .products
        .create(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(product))
}

/// List active products
#[utoipa::path(
    get,
    path = "/api/v1/products",
    responses((status = 200, description = "Product list")),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .services
        .products
        .list()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(products))
}

/// Get a product
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = i64, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .products
        .get(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

/// Adjust product stock by a relative delta
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/stock",
    params(("id" = i64, Path, description = "Product id")),
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "New stock level"),
        (status = 400, description = "Insufficient stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<AdjustStockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let new_stock = state
        .services
        .stock
        .adjust(id, payload.delta, &payload.reason, None)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "stock": new_stock })))
}

/// Stock movement log for a product
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/movements",
    params(("id" = i64, Path, description = "Product id")),
    responses((status = 200, description = "Movements, newest first")),
    tag = "products"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let movements = state
        .services
        .stock
        .movements(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(movements))
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product))
        .route("/", get(list_products))
        .route("/{id}", get(get_product))
        .route("/{id}/stock", post(adjust_stock))
        .route("/{id}/movements", get(list_movements))
}
