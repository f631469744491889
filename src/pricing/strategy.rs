use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::calculator::{round_price, PriceCalculator};
use super::conversion::UnitConverter;
use super::{PricingError, PricingResult};

/// Cargo classification that selects the pricing rule.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[strum(ascii_case_insensitive)]
pub enum GoodsType {
    #[sea_orm(string_value = "Merchandise")]
    Merchandise,
    #[sea_orm(string_value = "Car")]
    Car,
    #[sea_orm(string_value = "Metals")]
    Metals,
}

/// How a shipment's stored price was obtained.
///
/// `ManualPerTonne` prices are never touched by container recalculation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    #[sea_orm(string_value = "proportional")]
    Proportional,
    #[sea_orm(string_value = "manual_per_tonne")]
    ManualPerTonne,
}

/// The container figures a client's share is priced against.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerTerms {
    pub price: Decimal,
    pub total_volume: Decimal,
    pub container_type: Option<String>,
}

/// Goods-type specific figures submitted for one client.
///
/// Which fields are required depends on the goods type; the rest are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoodsInput {
    #[serde(default)]
    pub volume: Option<Decimal>,
    #[serde(default)]
    pub volume_vide: Option<Decimal>,
    #[serde(default)]
    pub volume_used: Option<Decimal>,
    #[serde(default)]
    pub tonnage: Option<Decimal>,
    #[serde(default)]
    pub price_per_tonne: Option<Decimal>,
    #[serde(default)]
    pub extra_charge: Decimal,
}

/// Priced shipment fields, ready to be written onto a shipment row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedGoods {
    pub goods_type: GoodsType,
    pub pricing_mode: PricingMode,
    /// Billable volume in cubic metres. For metals this is bookkeeping only.
    pub volume: Decimal,
    /// Stored shipment price, extra charge excluded.
    pub price: Decimal,
    pub total_price: Decimal,
    pub extra_charge: Decimal,
    pub tonnage: Option<Decimal>,
    pub price_per_tonne: Option<Decimal>,
    pub volume_vide: Option<Decimal>,
    pub volume_used: Option<Decimal>,
}

/// One pricing rule per goods type.
///
/// Client creation, shipment edits and bulk import all go through
/// [`PricingEngine::price`], which dispatches here.
pub trait GoodsPricingStrategy: Send + Sync {
    fn goods_type(&self) -> GoodsType;

    fn price(
        &self,
        engine: &PricingEngine,
        terms: &ContainerTerms,
        input: &GoodsInput,
    ) -> PricingResult<PricedGoods>;
}

/// Volume taken directly from the submission.
#[derive(Debug, Clone, Copy, Default)]
pub struct Merchandise;

/// Net volume: empty-vehicle volume minus the space already used.
#[derive(Debug, Clone, Copy, Default)]
pub struct Car;

/// Priced per tonne, outside the container-proportional rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct Metals;

/// `max(vide - used, 0)`
pub fn net_car_volume(volume_vide: Decimal, volume_used: Decimal) -> Decimal {
    (volume_vide - volume_used).max(Decimal::ZERO)
}

impl GoodsPricingStrategy for Merchandise {
    fn goods_type(&self) -> GoodsType {
        GoodsType::Merchandise
    }

    fn price(
        &self,
        engine: &PricingEngine,
        terms: &ContainerTerms,
        input: &GoodsInput,
    ) -> PricingResult<PricedGoods> {
        let extra_charge = non_negative("extra_charge", input.extra_charge)?;
        let volume = required("volume", input.volume)?;
        let volume = positive_volume(GoodsType::Merchandise, volume)?;
        let breakdown = engine
            .calculator()
            .calculate(terms.price, terms.total_volume, volume, extra_charge)?;

        Ok(PricedGoods {
            goods_type: GoodsType::Merchandise,
            pricing_mode: PricingMode::Proportional,
            volume,
            price: breakdown.base_price,
            total_price: breakdown.total_price,
            extra_charge,
            tonnage: None,
            price_per_tonne: None,
            volume_vide: None,
            volume_used: None,
        })
    }
}

impl GoodsPricingStrategy for Car {
    fn goods_type(&self) -> GoodsType {
        GoodsType::Car
    }

    fn price(
        &self,
        engine: &PricingEngine,
        terms: &ContainerTerms,
        input: &GoodsInput,
    ) -> PricingResult<PricedGoods> {
        let extra_charge = non_negative("extra_charge", input.extra_charge)?;
        let vide = non_negative("volume_vide", required("volume_vide", input.volume_vide)?)?;
        let used = non_negative("volume_used", input.volume_used.unwrap_or(Decimal::ZERO))?;
        let volume = positive_volume(GoodsType::Car, net_car_volume(vide, used))?;
        let breakdown = engine
            .calculator()
            .calculate(terms.price, terms.total_volume, volume, extra_charge)?;

        Ok(PricedGoods {
            goods_type: GoodsType::Car,
            pricing_mode: PricingMode::Proportional,
            volume,
            price: breakdown.base_price,
            total_price: breakdown.total_price,
            extra_charge,
            tonnage: None,
            price_per_tonne: None,
            volume_vide: Some(vide),
            volume_used: Some(used),
        })
    }
}

impl GoodsPricingStrategy for Metals {
    fn goods_type(&self) -> GoodsType {
        GoodsType::Metals
    }

    fn price(
        &self,
        engine: &PricingEngine,
        terms: &ContainerTerms,
        input: &GoodsInput,
    ) -> PricingResult<PricedGoods> {
        let extra_charge = non_negative("extra_charge", input.extra_charge)?;
        let tonnage = non_negative("tonnage", required("tonnage", input.tonnage)?)?;
        let price_per_tonne = non_negative(
            "price_per_tonne",
            required("price_per_tonne", input.price_per_tonne)?,
        )?;

        let volume = engine
            .converter()
            .tonnes_to_m3(tonnage, terms.container_type.as_deref())?;
        let price = price_per_tonne
            .checked_mul(tonnage)
            .map(round_price)
            .ok_or(PricingError::Overflow("price"))?;
        let total_price = price
            .checked_add(extra_charge)
            .map(round_price)
            .ok_or(PricingError::Overflow("total_price"))?;

        Ok(PricedGoods {
            goods_type: GoodsType::Metals,
            pricing_mode: PricingMode::ManualPerTonne,
            volume,
            price,
            total_price,
            extra_charge,
            tonnage: Some(tonnage),
            price_per_tonne: Some(price_per_tonne),
            volume_vide: None,
            volume_used: None,
        })
    }
}

static MERCHANDISE: Merchandise = Merchandise;
static CAR: Car = Car;
static METALS: Metals = Metals;

pub fn strategy_for(goods_type: GoodsType) -> &'static dyn GoodsPricingStrategy {
    match goods_type {
        GoodsType::Merchandise => &MERCHANDISE,
        GoodsType::Car => &CAR,
        GoodsType::Metals => &METALS,
    }
}

/// Calculator and unit converter, configured once at start-up.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingEngine {
    calculator: PriceCalculator,
    converter: UnitConverter,
}

impl PricingEngine {
    pub fn new(calculator: PriceCalculator, converter: UnitConverter) -> Self {
        Self {
            calculator,
            converter,
        }
    }

    pub fn calculator(&self) -> &PriceCalculator {
        &self.calculator
    }

    pub fn converter(&self) -> &UnitConverter {
        &self.converter
    }

    pub fn price(
        &self,
        goods_type: GoodsType,
        terms: &ContainerTerms,
        input: &GoodsInput,
    ) -> PricingResult<PricedGoods> {
        strategy_for(goods_type).price(self, terms, input)
    }
}

fn required(field: &'static str, value: Option<Decimal>) -> PricingResult<Decimal> {
    value.ok_or(PricingError::MissingField(field))
}

fn non_negative(field: &'static str, value: Decimal) -> PricingResult<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(PricingError::NegativeValue { field, value });
    }
    Ok(value)
}

fn positive_volume(goods_type: GoodsType, volume: Decimal) -> PricingResult<Decimal> {
    if volume <= Decimal::ZERO {
        return Err(PricingError::NonPositiveVolume { goods_type, volume });
    }
    Ok(volume)
}
