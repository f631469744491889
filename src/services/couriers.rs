use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, ModelTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{find_courier, non_negative, required_text};
use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::models::{courier, courier_item};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCourierInput {
    #[validate(length(min = 1, max = 64))]
    pub reference: String,
    /// Defaults to today.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CourierItemInput {
    #[validate(length(min = 1, max = 128))]
    pub sender_name: String,
    #[validate(length(min = 1, max = 128))]
    pub receiver_name: String,
    pub amount: Decimal,
    #[serde(default)]
    pub service: Decimal,
    #[serde(default)]
    pub exchange_rate: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourierDetail {
    pub courier: courier::Model,
    pub items: Vec<courier_item::Model>,
    /// What the cash box should hold for this run.
    pub total_collected: Decimal,
}

/// Sum of amount plus service fee over a courier run.
pub(crate) async fn collected_total<C>(db: &C, courier: &courier::Model) -> Result<Decimal, ServiceError>
where
    C: ConnectionTrait,
{
    let items = courier.find_related(courier_item::Entity).all(db).await?;
    sum_collected(&items)
}

fn sum_collected(items: &[courier_item::Model]) -> Result<Decimal, ServiceError> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |total, item| {
            item.collected().and_then(|collected| total.checked_add(collected))
        })
        .ok_or_else(|| {
            ServiceError::ValidationError("collected total is too large to compute".to_string())
        })
}

/// Courier cash-exchange runs.
#[derive(Clone)]
pub struct CourierService {
    db_pool: Arc<DbPool>,
}

impl CourierService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateCourierInput) -> Result<courier::Model, ServiceError> {
        input.validate()?;
        let model = courier::ActiveModel {
            reference: Set(required_text("reference", &input.reference)?),
            date: Set(input.date.unwrap_or_else(|| Utc::now().date_naive())),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;
        info!(courier_id = %model.id, reference = %model.reference, "Courier created");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        courier_id: Uuid,
        input: CourierItemInput,
    ) -> Result<courier_item::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        find_courier(db, courier_id).await?;
        if let Some(rate) = input.exchange_rate {
            if rate <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "exchange_rate must be greater than zero (got {rate})"
                )));
            }
        }

        let item = courier_item::ActiveModel {
            courier_id: Set(courier_id),
            sender_name: Set(required_text("sender_name", &input.sender_name)?),
            receiver_name: Set(required_text("receiver_name", &input.receiver_name)?),
            amount: Set(non_negative("amount", input.amount)?),
            service: Set(non_negative("service", input.service)?),
            exchange_rate: Set(input.exchange_rate),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<CourierDetail, ServiceError> {
        let db = &*self.db_pool;
        let courier = find_courier(db, id).await?;
        let items = courier
            .find_related(courier_item::Entity)
            .order_by_asc(courier_item::Column::CreatedAt)
            .all(db)
            .await?;
        let total_collected = sum_collected(&items)?;
        Ok(CourierDetail {
            courier,
            items,
            total_collected,
        })
    }
}
