use super::common::{map_service_error, success_response, validate_input};
use crate::{
    entities::delivery::DeliveryStatus,
    errors::ApiError,
    handlers::AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateDeliveryStatusRequest {
    /// One of "prepare", "en_route", "livre".
    #[validate(length(min = 1))]
    pub status: String,
}

/// List deliveries
#[utoipa::path(
    get,
    path = "/api/v1/deliveries",
    responses((status = 200, description = "Deliveries, newest first")),
    tag = "deliveries"
)]
pub async fn list_deliveries(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let deliveries = state
        .services
        .deliveries
        .list_deliveries()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(deliveries))
}

/// Get a delivery
#[utoipa::path(
    get,
    path = "/api/v1/deliveries/{id}",
    params(("id" = i64, Path, description = "Delivery id")),
    responses(
        (status = 200, description = "Delivery"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn get_delivery(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let delivery = state
        .services
        .deliveries
        .get_delivery(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(delivery))
}

/// Advance a delivery along prepare -> en_route -> livre
#[utoipa::path(
    put,
    path = "/api/v1/deliveries/{id}/status",
    params(("id" = i64, Path, description = "Delivery id")),
    request_body = UpdateDeliveryStatusRequest,
    responses(
        (status = 200, description = "Delivery updated"),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "deliveries"
)]
pub async fn update_delivery_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateDeliveryStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let status: DeliveryStatus = payload
        .status
        .parse()
        .map_err(ApiError::BadRequest)?;
    let delivery = state
        .services
        .deliveries
        .update_status(id, status)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(delivery))
}

pub fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_deliveries))
        .route("/{id}", get(get_delivery))
        .route("/{id}/status", put(update_delivery_status))
}
