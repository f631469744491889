use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use super::common::{created, JsonBody};
use crate::errors::ServiceError;
use crate::models::{courier, courier_item};
use crate::services::couriers::{CourierDetail, CourierItemInput, CreateCourierInput};
use crate::{ApiResponse, ApiResult, AppState};

pub fn courier_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_courier))
        .route("/:id", get(get_courier))
        .route("/:id/items", post(add_item))
}

pub async fn create_courier(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateCourierInput>,
) -> Result<(StatusCode, Json<ApiResponse<courier::Model>>), ServiceError> {
    let courier = state.services.couriers.create(payload).await?;
    Ok(created(courier))
}

pub async fn get_courier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<CourierDetail> {
    let detail = state.services.couriers.get(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

pub async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<CourierItemInput>,
) -> Result<(StatusCode, Json<ApiResponse<courier_item::Model>>), ServiceError> {
    let item = state.services.couriers.add_item(id, payload).await?;
    Ok(created(item))
}
