use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;

use super::common::JsonBody;
use crate::models::shipment;
use crate::services::products::ShipmentAllocation;
use crate::services::shipments::{ClientShipment, EditShipmentInput, PaymentInput, ShipmentRemoval};
use crate::{ApiResponse, ApiResult, AppState};

pub fn shipment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:id",
            get(get_shipment).put(edit_shipment).delete(delete_shipment),
        )
        .route("/:id/payment", put(update_payment))
        .route("/:id/allocation", get(get_allocation))
}

pub async fn get_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ClientShipment> {
    let shipment = state.services.shipments.get(id).await?;
    Ok(Json(ApiResponse::success(shipment)))
}

pub async fn edit_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<EditShipmentInput>,
) -> ApiResult<ClientShipment> {
    let edited = state.services.shipments.edit(id, payload).await?;
    Ok(Json(ApiResponse::success(edited)))
}

pub async fn update_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(payload): JsonBody<PaymentInput>,
) -> ApiResult<shipment::Model> {
    let updated = state.services.shipments.update_payment(id, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn delete_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ShipmentRemoval> {
    let removal = state.services.shipments.delete(id).await?;
    Ok(Json(ApiResponse::success(removal)))
}

/// Shipment price split across the client's products.
pub async fn get_allocation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ShipmentAllocation> {
    let allocation = state.services.products.allocation_for_shipment(id).await?;
    Ok(Json(ApiResponse::success(allocation)))
}
