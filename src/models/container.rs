use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::pricing::ContainerTerms;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContainerStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "delivered")]
    Delivered,
}

/// A shipping container whose price and volume are shared among its clients.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "containers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub container_number: String,
    pub container_name: Option<String>,
    /// Free text such as "20ft" or "40ft HC"; selects the tonne factor.
    pub container_type: String,
    pub destination: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub total_volume: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub price: Decimal,
    pub status: ContainerStatus,
    /// Loaded first at departure.
    pub priority: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::shipment::Entity")]
    Shipments,
}

impl Related<super::shipment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shipments.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();
        if insert {
            if let ActiveValue::NotSet = active_model.id {
                active_model.id = Set(Uuid::new_v4());
            }
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }
        active_model.updated_at = Set(now);
        Ok(active_model)
    }
}

impl Model {
    pub fn terms(&self) -> ContainerTerms {
        ContainerTerms {
            price: self.price,
            total_volume: self.total_volume,
            container_type: Some(self.container_type.clone()).filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.status == ContainerStatus::Delivered
    }
}
