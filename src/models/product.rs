use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

use crate::pricing::{GoodsType, ProductLine, ProductMeasures};

/// An itemised cargo line. Products belong to the client, not to a container.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub client_id: Uuid,
    pub reference: String,
    /// Fixed at creation.
    pub goods_type: GoodsType,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub length: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub width: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub height: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub tonnage: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub volume_vide: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub volume_used: Option<Decimal>,
    /// Derived from the measures; always zero for metals.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub volume: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id",
        on_delete = "Cascade"
    )]
    Client,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
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
    pub fn line(&self) -> ProductLine {
        ProductLine {
            id: self.id,
            goods_type: self.goods_type,
            tonnage: self.tonnage,
            volume: self.volume,
        }
    }

    pub fn measures(&self) -> ProductMeasures {
        ProductMeasures {
            quantity: self.quantity,
            length: self.length,
            width: self.width,
            height: self.height,
            volume_vide: self.volume_vide,
            volume_used: self.volume_used,
        }
    }
}
