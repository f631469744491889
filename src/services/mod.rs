//! Transactional workflows over the freight entities.
//!
//! Services own the database handle and the start-up configuration they
//! need. Every write runs in one transaction (see [`crate::db::with_transaction`]).

pub mod billetages;
pub mod clients;
pub mod containers;
pub mod couriers;
pub mod products;
pub mod shipments;

use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
};
use tracing::debug;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{billetage, client, container, courier, product, shipment};

pub use billetages::BilletageService;
pub use clients::ClientService;
pub use containers::ContainerService;
pub use couriers::CourierService;
pub use products::ProductService;
pub use shipments::ShipmentService;

pub(crate) async fn find_container<C>(db: &C, id: Uuid) -> Result<container::Model, ServiceError>
where
    C: ConnectionTrait,
{
    container::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Container", id))
}

pub(crate) async fn find_client<C>(db: &C, id: Uuid) -> Result<client::Model, ServiceError>
where
    C: ConnectionTrait,
{
    client::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Client", id))
}

pub(crate) async fn find_shipment<C>(db: &C, id: Uuid) -> Result<shipment::Model, ServiceError>
where
    C: ConnectionTrait,
{
    shipment::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Shipment", id))
}

pub(crate) async fn find_product<C>(db: &C, id: Uuid) -> Result<product::Model, ServiceError>
where
    C: ConnectionTrait,
{
    product::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Product", id))
}

pub(crate) async fn find_courier<C>(db: &C, id: Uuid) -> Result<courier::Model, ServiceError>
where
    C: ConnectionTrait,
{
    courier::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Courier", id))
}

pub(crate) async fn find_billetage<C>(db: &C, id: Uuid) -> Result<billetage::Model, ServiceError>
where
    C: ConnectionTrait,
{
    billetage::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Billetage", id))
}

/// Deletes a client together with its products and shipments.
pub(crate) async fn delete_client_cascade<C>(db: &C, client: client::Model) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    product::Entity::delete_many()
        .filter(product::Column::ClientId.eq(client.id))
        .exec(db)
        .await?;
    shipment::Entity::delete_many()
        .filter(shipment::Column::ClientId.eq(client.id))
        .exec(db)
        .await?;
    client.delete(db).await?;
    Ok(())
}

/// Removes the client when no shipment references it any more.
pub(crate) async fn remove_client_if_orphaned<C>(db: &C, client_id: Uuid) -> Result<bool, ServiceError>
where
    C: ConnectionTrait,
{
    let remaining = shipment::Entity::find()
        .filter(shipment::Column::ClientId.eq(client_id))
        .count(db)
        .await?;
    if remaining > 0 {
        return Ok(false);
    }
    match client::Entity::find_by_id(client_id).one(db).await? {
        Some(client) => {
            debug!(client_id = %client_id, "Removing client without shipments");
            delete_client_cascade(db, client).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Trimmed, non-empty text for a required field.
pub(crate) fn required_text(field: &str, value: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::ValidationError(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Blank optional text is stored as `NULL`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Import failures carry the 1-based spreadsheet row.
pub(crate) fn row_error(row: usize, message: impl std::fmt::Display) -> ServiceError {
    ServiceError::ValidationError(format!("row {row}: {message}"))
}

/// Prefixes a validation failure with its row. Other errors pass through.
pub(crate) fn at_row(row: usize, err: ServiceError) -> ServiceError {
    match err {
        ServiceError::ValidationError(message) => row_error(row, message),
        other => other,
    }
}

pub(crate) fn non_negative(field: &str, value: Decimal) -> Result<Decimal, ServiceError> {
    if value < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "{field} must not be negative (got {value})"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn required_text_is_trimmed() {
        assert_eq!(required_text("mark", "  KM-12 ").unwrap(), "KM-12");
        assert_matches!(
            required_text("mark", "   "),
            Err(ServiceError::ValidationError(msg)) if msg == "mark is required"
        );
    }

    #[test]
    fn blank_optional_text_becomes_none() {
        assert_eq!(optional_text(Some("  ".into())), None);
        assert_eq!(optional_text(Some(" Moroni ".into())), Some("Moroni".into()));
        assert_eq!(optional_text(None), None);
    }

    #[test]
    fn row_prefix_applies_to_validation_errors_only() {
        assert_matches!(
            at_row(3, ServiceError::ValidationError("length must not be negative".into())),
            ServiceError::ValidationError(msg) if msg == "row 3: length must not be negative"
        );
        assert_matches!(
            at_row(3, ServiceError::not_found("Client", 1)),
            ServiceError::NotFound(msg) if msg == "Client 1 not found"
        );
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert_eq!(non_negative("price", dec!(0)).unwrap(), dec!(0));
        assert_matches!(non_negative("price", dec!(-1)), Err(ServiceError::ValidationError(_)));
    }
}
