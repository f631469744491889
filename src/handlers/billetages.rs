use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::common::{created, JsonBody};
use crate::errors::ServiceError;
use crate::services::billetages::{BilletageInput, BilletageReport};
use crate::{ApiResponse, ApiResult, AppState};

pub fn billetage_routes() -> Router<AppState> {
    Router::new().route("/", post(create_billetage)).route(
        "/:id",
        get(get_billetage)
            .put(update_billetage)
            .delete(delete_billetage),
    )
}

pub async fn create_billetage(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<BilletageInput>,
) -> Result<(StatusCode, Json<ApiResponse<BilletageReport>>), ServiceError> {
    let report = state.services.billetages.create(payload).await?;
    Ok(created(report))
}

pub async fn get_billetage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<BilletageReport> {
    let report = state.services.billetages.get(id).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Replaces the counts; every total is recomputed.
pub async fn update_billetage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<BilletageInput>,
) -> ApiResult<BilletageReport> {
    let report = state.services.billetages.update(id, payload).await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn delete_billetage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    state.services.billetages.delete(id).await?;
    Ok(Json(ApiResponse::success(json!({ "billetage_id": id, "deleted": true }))))
}
