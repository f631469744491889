use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{find_container, non_negative, optional_text, remove_client_if_orphaned, required_text};
use crate::db::{with_transaction, DbPool};
use crate::errors::ServiceError;
use crate::models::{client, container, shipment, ContainerStatus};
use crate::pricing::recalculation::terms_changed;
use crate::pricing::{
    plan_recalculation, PricingEngine, PricingError, PricingResult, RecalculationPlan,
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateContainerInput {
    #[validate(length(min = 1, max = 64))]
    pub container_number: String,
    #[serde(default)]
    pub container_name: Option<String>,
    #[validate(length(max = 32))]
    #[serde(default)]
    pub container_type: String,
    #[serde(default)]
    pub destination: Option<String>,
    pub total_volume: Decimal,
    pub price: Decimal,
}

/// Partial edit. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateContainerInput {
    #[validate(length(min = 1, max = 64))]
    pub container_number: Option<String>,
    pub container_name: Option<String>,
    #[validate(length(max = 32))]
    pub container_type: Option<String>,
    pub destination: Option<String>,
    pub total_volume: Option<Decimal>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerUpdate {
    pub container: container::Model,
    /// Present when the price or the volume changed.
    pub recalculation: Option<RecalculationPlan>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShipmentLine {
    #[serde(flatten)]
    pub shipment: shipment::Model,
    pub client: Option<client::Model>,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerTotals {
    pub shipment_count: usize,
    pub allocated_volume: Decimal,
    pub remaining_volume: Decimal,
    pub billed: Decimal,
    pub paid: Decimal,
    pub outstanding: Decimal,
}

impl ContainerTotals {
    fn from_shipments<'a>(
        total_volume: Decimal,
        shipments: impl Iterator<Item = &'a shipment::Model>,
    ) -> PricingResult<Self> {
        let sum = |acc: Decimal, value: Decimal, field| {
            acc.checked_add(value).ok_or(PricingError::Overflow(field))
        };
        let mut totals = ContainerTotals::default();
        for s in shipments {
            totals.shipment_count += 1;
            totals.allocated_volume = sum(totals.allocated_volume, s.volume, "allocated_volume")?;
            totals.billed = sum(totals.billed, s.total_price(), "billed")?;
            totals.paid = sum(totals.paid, s.paid_amount, "paid")?;
        }
        totals.remaining_volume = total_volume - totals.allocated_volume;
        totals.outstanding = totals.billed - totals.paid;
        Ok(totals)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerDetail {
    pub container: container::Model,
    pub shipments: Vec<ShipmentLine>,
    pub totals: ContainerTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerRemoval {
    pub container_id: Uuid,
    pub shipments_removed: usize,
    pub clients_removed: usize,
}

/// Containers and the repricing of their shipments.
#[derive(Clone)]
pub struct ContainerService {
    db_pool: Arc<DbPool>,
    engine: PricingEngine,
}

impl ContainerService {
    pub fn new(db_pool: Arc<DbPool>, engine: PricingEngine) -> Self {
        Self { db_pool, engine }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateContainerInput) -> Result<container::Model, ServiceError> {
        input.validate()?;
        let model = container::ActiveModel {
            container_number: Set(required_text("container_number", &input.container_number)?),
            container_name: Set(optional_text(input.container_name)),
            container_type: Set(input.container_type.trim().to_string()),
            destination: Set(optional_text(input.destination)),
            total_volume: Set(non_negative("total_volume", input.total_volume)?),
            price: Set(non_negative("price", input.price)?),
            status: Set(ContainerStatus::Active),
            priority: Set(false),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;

        info!(container_id = %model.id, number = %model.container_number, "Container created");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<ContainerDetail, ServiceError> {
        let db = &*self.db_pool;
        let container = find_container(db, id).await?;
        let rows = shipment::Entity::find()
            .filter(shipment::Column::ContainerId.eq(id))
            .order_by_asc(shipment::Column::CreatedAt)
            .find_also_related(client::Entity)
            .all(db)
            .await?;

        let totals =
            ContainerTotals::from_shipments(container.total_volume, rows.iter().map(|(s, _)| s))?;
        let shipments = rows
            .into_iter()
            .map(|(shipment, client)| ShipmentLine {
                total_price: shipment.total_price(),
                shipment,
                client,
            })
            .collect();

        Ok(ContainerDetail {
            container,
            shipments,
            totals,
        })
    }

    /// Edits a container. A price or volume change reprices every
    /// proportionally priced shipment in the same transaction.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateContainerInput,
    ) -> Result<ContainerUpdate, ServiceError> {
        input.validate()?;
        let calculator = *self.engine.calculator();

        let update = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let existing = find_container(txn, id).await?;
                let price = match input.price {
                    Some(price) => non_negative("price", price)?,
                    None => existing.price,
                };
                let total_volume = match input.total_volume {
                    Some(volume) => non_negative("total_volume", volume)?,
                    None => existing.total_volume,
                };
                let reprice =
                    terms_changed(existing.price, existing.total_volume, price, total_volume);

                let mut active: container::ActiveModel = existing.into();
                if let Some(number) = input.container_number {
                    active.container_number = Set(required_text("container_number", &number)?);
                }
                if let Some(name) = input.container_name {
                    active.container_name = Set(optional_text(Some(name)));
                }
                if let Some(container_type) = input.container_type {
                    active.container_type = Set(container_type.trim().to_string());
                }
                if let Some(destination) = input.destination {
                    active.destination = Set(optional_text(Some(destination)));
                }
                active.price = Set(price);
                active.total_volume = Set(total_volume);
                let container = active.update(txn).await?;

                if !reprice {
                    return Ok(ContainerUpdate {
                        container,
                        recalculation: None,
                    });
                }

                let shipments = shipment::Entity::find()
                    .filter(shipment::Column::ContainerId.eq(id))
                    .all(txn)
                    .await?;
                let plan = plan_recalculation(
                    &calculator,
                    container.price,
                    container.total_volume,
                    shipments.iter().map(shipment::Model::snapshot),
                )?;
                for change in plan.changed() {
                    shipment::ActiveModel {
                        id: Set(change.shipment_id),
                        price: Set(change.price),
                        ..Default::default()
                    }
                    .update(txn)
                    .await?;
                }

                Ok(ContainerUpdate {
                    container,
                    recalculation: Some(plan),
                })
            })
        })
        .await?;

        if let Some(plan) = &update.recalculation {
            let changed = plan.changed().count();
            counter!("freight.shipments.repriced", changed as u64);
            info!(
                container_id = %id,
                repriced = changed,
                skipped = plan.skipped.len(),
                "Container terms changed, shipments repriced"
            );
        }
        Ok(update)
    }

    #[instrument(skip(self))]
    pub async fn mark_delivered(&self, id: Uuid) -> Result<container::Model, ServiceError> {
        let db = &*self.db_pool;
        let existing = find_container(db, id).await?;
        if existing.is_delivered() {
            return Err(ServiceError::InvalidOperation(format!(
                "Container {} is already delivered",
                existing.container_number
            )));
        }
        let mut active: container::ActiveModel = existing.into();
        active.status = Set(ContainerStatus::Delivered);
        let updated = active.update(db).await?;
        info!(container_id = %id, "Container delivered");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn toggle_priority(&self, id: Uuid) -> Result<container::Model, ServiceError> {
        let db = &*self.db_pool;
        let existing = find_container(db, id).await?;
        let priority = !existing.priority;
        let mut active: container::ActiveModel = existing.into();
        active.priority = Set(priority);
        Ok(active.update(db).await?)
    }

    /// Deletes a container, its shipments, and every client left without a
    /// shipment afterwards.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<ContainerRemoval, ServiceError> {
        let removal = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let container = find_container(txn, id).await?;
                let shipments = container.find_related(shipment::Entity).all(txn).await?;
                let client_ids: BTreeSet<Uuid> = shipments.iter().map(|s| s.client_id).collect();

                shipment::Entity::delete_many()
                    .filter(shipment::Column::ContainerId.eq(id))
                    .exec(txn)
                    .await?;

                let mut clients_removed = 0;
                for client_id in client_ids {
                    if remove_client_if_orphaned(txn, client_id).await? {
                        clients_removed += 1;
                    }
                }
                container.delete(txn).await?;

                Ok(ContainerRemoval {
                    container_id: id,
                    shipments_removed: shipments.len(),
                    clients_removed,
                })
            })
        })
        .await?;

        info!(
            container_id = %id,
            shipments = removal.shipments_removed,
            clients = removal.clients_removed,
            "Container deleted"
        );
        Ok(removal)
    }
}
