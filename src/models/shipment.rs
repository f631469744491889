use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::pricing::{
    GoodsInput, GoodsType, PricedGoods, PricingError, PricingMode, PricingResult,
    ShipmentSnapshot,
};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PaymentStatus {
    #[default]
    #[sea_orm(string_value = "unpaid")]
    Unpaid,
    #[sea_orm(string_value = "partial")]
    Partial,
    #[sea_orm(string_value = "paid")]
    Paid,
}

impl PaymentStatus {
    /// Amount recorded as paid for a shipment priced at `price`.
    ///
    /// Only a partial payment takes the submitted amount; a blank one counts
    /// as zero.
    pub fn paid_amount(self, submitted: Option<Decimal>, price: Decimal) -> PricingResult<Decimal> {
        match self {
            PaymentStatus::Unpaid => Ok(Decimal::ZERO),
            PaymentStatus::Paid => Ok(price),
            PaymentStatus::Partial => {
                let amount = submitted.unwrap_or(Decimal::ZERO);
                if amount < Decimal::ZERO {
                    return Err(PricingError::NegativeValue {
                        field: "paid_amount",
                        value: amount,
                    });
                }
                Ok(amount)
            }
        }
    }
}

/// One client's share of one container.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub client_id: Uuid,
    pub container_id: Uuid,
    pub goods_type: GoodsType,
    pub pricing_mode: PricingMode,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub volume: Decimal,
    /// Base price; the extra charge is kept apart.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub extra_charge: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub tonnage: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub price_per_tonne: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub volume_vide: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub volume_used: Option<Decimal>,
    pub payment_status: PaymentStatus,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub paid_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::container::Entity",
        from = "Column::ContainerId",
        to = "super::container::Column::Id",
        on_delete = "Cascade"
    )]
    Container,
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id",
        on_delete = "Cascade"
    )]
    Client,
}

impl Related<super::container::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Container.def()
    }
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
    pub fn snapshot(&self) -> ShipmentSnapshot {
        ShipmentSnapshot {
            id: self.id,
            pricing_mode: self.pricing_mode,
            volume: self.volume,
            extra_charge: self.extra_charge,
            price: self.price,
        }
    }

    pub fn total_price(&self) -> Decimal {
        self.price + self.extra_charge
    }

    /// The stored figures, as a pricing submission.
    pub fn goods_input(&self) -> GoodsInput {
        GoodsInput {
            volume: Some(self.volume),
            volume_vide: self.volume_vide,
            volume_used: self.volume_used,
            tonnage: self.tonnage,
            price_per_tonne: self.price_per_tonne,
            extra_charge: self.extra_charge,
        }
    }
}

impl ActiveModel {
    /// Writes every priced field onto the row.
    pub fn apply_pricing(&mut self, priced: &PricedGoods) {
        self.goods_type = Set(priced.goods_type);
        self.pricing_mode = Set(priced.pricing_mode);
        self.volume = Set(priced.volume);
        self.price = Set(priced.price);
        self.extra_charge = Set(priced.extra_charge);
        self.tonnage = Set(priced.tonnage);
        self.price_per_tonne = Set(priced.price_per_tonne);
        self.volume_vide = Set(priced.volume_vide);
        self.volume_used = Set(priced.volume_used);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn paid_amount_follows_status() {
        assert_eq!(
            PaymentStatus::Paid.paid_amount(Some(dec!(10)), dec!(5250)).unwrap(),
            dec!(5250)
        );
        assert_eq!(
            PaymentStatus::Partial.paid_amount(Some(dec!(1000)), dec!(5250)).unwrap(),
            dec!(1000)
        );
        assert_eq!(
            PaymentStatus::Partial.paid_amount(None, dec!(5250)).unwrap(),
            Decimal::ZERO
        );
        assert_eq!(
            PaymentStatus::Unpaid.paid_amount(Some(dec!(1000)), dec!(5250)).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn negative_partial_payment_is_rejected() {
        assert_matches!(
            PaymentStatus::Partial.paid_amount(Some(dec!(-1)), dec!(100)),
            Err(PricingError::NegativeValue { field: "paid_amount", .. })
        );
    }

    #[test]
    fn payment_status_parses_form_values() {
        assert_eq!(PaymentStatus::from_str("Partial").unwrap(), PaymentStatus::Partial);
        assert_eq!(PaymentStatus::Paid.to_string(), "paid");
    }
}
