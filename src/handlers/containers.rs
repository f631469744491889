use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use super::common::{created, JsonBody};
use crate::errors::ServiceError;
use crate::models::container;
use crate::services::containers::{
    ContainerDetail, ContainerRemoval, ContainerUpdate, CreateContainerInput, UpdateContainerInput,
};
use crate::services::shipments::{AddClientInput, ClientShipment, ImportRow, ImportSummary};
use crate::{ApiResponse, ApiResult, AppState};

pub fn container_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_container))
        .route(
            "/:id",
            get(get_container).put(update_container).delete(delete_container),
        )
        .route("/:id/deliver", post(deliver_container))
        .route("/:id/priority", post(toggle_priority))
        .route("/:id/clients", post(add_client))
        .route("/:id/import", post(import_rows))
}

pub async fn create_container(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateContainerInput>,
) -> Result<(StatusCode, Json<ApiResponse<container::Model>>), ServiceError> {
    let container = state.services.containers.create(payload).await?;
    Ok(created(container))
}

pub async fn get_container(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ContainerDetail> {
    let detail = state.services.containers.get(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// Returns the repricing summary when the price or volume changed.
pub async fn update_container(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<UpdateContainerInput>,
) -> ApiResult<ContainerUpdate> {
    let update = state.services.containers.update(id, payload).await?;
    Ok(Json(ApiResponse::success(update)))
}

pub async fn delete_container(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ContainerRemoval> {
    let removal = state.services.containers.delete(id).await?;
    Ok(Json(ApiResponse::success(removal)))
}

pub async fn deliver_container(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<container::Model> {
    let container = state.services.containers.mark_delivered(id).await?;
    Ok(Json(ApiResponse::success(container)))
}

pub async fn toggle_priority(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<container::Model> {
    let container = state.services.containers.toggle_priority(id).await?;
    Ok(Json(ApiResponse::success(container)))
}

pub async fn add_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<AddClientInput>,
) -> Result<(StatusCode, Json<ApiResponse<ClientShipment>>), ServiceError> {
    let created_shipment = state.services.shipments.add_client(id, payload).await?;
    Ok(created(created_shipment))
}

pub async fn import_rows(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(rows): JsonBody<Vec<ImportRow>>,
) -> Result<(StatusCode, Json<ApiResponse<ImportSummary>>), ServiceError> {
    let summary = state.services.shipments.import_rows(id, rows).await?;
    Ok(created(summary))
}
