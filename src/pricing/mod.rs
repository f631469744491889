//! Freight pricing rules.
//!
//! Everything in this module is pure: it takes plain numbers (container
//! price, container volume, client volume, tonnage, extra charges) and returns
//! plain numbers. Persistence and transactions live in [`crate::services`].

pub mod allocation;
pub mod calculator;
pub mod conversion;
pub mod numeric;
pub mod recalculation;
pub mod strategy;

use rust_decimal::Decimal;
use thiserror::Error;

pub use allocation::{
    allocate, product_volume, AllocationReport, ProductAllocation, ProductLine, ProductMeasures,
};
pub use calculator::{round_cents, round_price, PriceBreakdown, PriceCalculator};
pub use conversion::{ConversionFactors, UnitConverter};
pub use numeric::{NumericError, RawCell};
pub use recalculation::{plan_recalculation, RecalculationPlan, RepricedShipment, ShipmentSnapshot};
pub use strategy::{
    strategy_for, ContainerTerms, GoodsInput, GoodsPricingStrategy, GoodsType, PricedGoods,
    PricingEngine, PricingMode,
};

/// Errors raised while validating pricing input.
///
/// These are always scoped to the submission that produced them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error(transparent)]
    Numeric(#[from] NumericError),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("{field} must not be negative (got {value})")]
    NegativeValue { field: &'static str, value: Decimal },

    #[error("{goods_type} volume must be greater than zero (got {volume})")]
    NonPositiveVolume { goods_type: GoodsType, volume: Decimal },

    #[error("{0} is too large to compute")]
    Overflow(&'static str),
}

pub type PricingResult<T> = Result<T, PricingError>;
