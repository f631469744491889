use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

use crate::reconciliation::{BalanceStatus, CashCount};

/// A cash counting session.
///
/// `counts` and `exchange_rates` are stored as JSON. `difference` is written
/// together with the two totals it is derived from.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "billetages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub courier_id: Option<Uuid>,
    pub notes: Option<String>,
    pub reporting_currency: String,
    pub counts: Json,
    pub exchange_rates: Json,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub total_counted: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub expected_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub difference: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::courier::Entity",
        from = "Column::CourierId",
        to = "super::courier::Column::Id",
        on_delete = "SetNull"
    )]
    Courier,
}

impl Related<super::courier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Courier.def()
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
    pub fn cash_count(&self) -> Result<CashCount, serde_json::Error> {
        serde_json::from_value(self.counts.clone())
    }

    pub fn status(&self, tolerance: Decimal) -> BalanceStatus {
        BalanceStatus::classify(self.difference, tolerance)
    }
}
