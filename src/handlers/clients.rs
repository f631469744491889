use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::common::{created, JsonBody};
use crate::errors::ServiceError;
use crate::models::{client, product};
use crate::services::products::{ProductImport, ProductImportRow, ProductInput};
use crate::{ApiResponse, ApiResult, AppState};

pub fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/by-mark/:mark", get(get_client_by_mark))
        .route("/:id", delete(delete_client))
        .route("/:id/products", get(list_products).post(add_product))
        .route("/:id/products/import", post(import_products))
}

pub async fn get_client_by_mark(
    State(state): State<AppState>,
    Path(mark): Path<String>,
) -> ApiResult<client::Model> {
    let client = state.services.clients.find_by_mark(&mark).await?;
    Ok(Json(ApiResponse::success(client)))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    state.services.clients.delete(id).await?;
    Ok(Json(ApiResponse::success(json!({ "client_id": id, "deleted": true }))))
}

pub async fn list_products(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<product::Model>> {
    let products = state.services.products.list_for_client(id).await?;
    Ok(Json(ApiResponse::success(products)))
}

pub async fn add_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<ProductInput>,
) -> Result<(StatusCode, Json<ApiResponse<product::Model>>), ServiceError> {
    let product = state.services.products.add(id, payload).await?;
    Ok(created(product))
}

/// Spreadsheet upload, one JSON object per row.
pub async fn import_products(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(rows): JsonBody<Vec<ProductImportRow>>,
) -> Result<(StatusCode, Json<ApiResponse<ProductImport>>), ServiceError> {
    let summary = state.services.products.import_rows(id, rows).await?;
    Ok(created(summary))
}
