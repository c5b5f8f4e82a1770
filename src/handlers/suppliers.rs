use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{errors::ApiError, handlers::AppState, services::suppliers::CreateSupplierInput};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};

/// Register a supplier
#[utoipa::path(
    post,
    path = "/api/v1/suppliers",
    request_body = CreateSupplierInput,
    responses((status = 201, description = "Supplier created")),
    tag = "suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    Json(payload): Json<CreateSupplierInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let supplier = state
        .services
        .suppliers
        .create(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(supplier))
}

/// List suppliers
#[utoipa::path(
    get,
    path = "/api/v1/suppliers",
    responses((status = 200, description = "Suppliers by name")),
    tag = "suppliers"
)]
pub async fn list_suppliers(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let suppliers = state
        .services
        .suppliers
        .list()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(suppliers))
}

/// Get a supplier
#[utoipa::path(
    get,
    path = "/api/v1/suppliers/{id}",
    params(("id" = i64, Path, description = "Supplier id")),
    responses(
        (status = 200, description = "Supplier"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let supplier = state
        .services
        .suppliers
        .get(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(supplier))
}

pub fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_supplier))
        .route("/", get(list_suppliers))
        .route("/{id}", get(get_supplier))
}
