use axum::{
    extract::{Path, State},
    routing::put,
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::common::JsonBody;
use crate::models::product;
use crate::services::products::ProductInput;
use crate::{ApiResponse, ApiResult, AppState};

pub fn product_routes() -> Router<AppState> {
    Router::new().route("/:id", put(edit_product).delete(delete_product))
}

/// A submitted `goods_type` is ignored; products keep the one they were created with.
pub async fn edit_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<ProductInput>,
) -> ApiResult<product::Model> {
    let product = state.services.products.edit(id, payload).await?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    state.services.products.delete(id).await?;
    Ok(Json(ApiResponse::success(json!({ "product_id": id, "deleted": true }))))
}
