use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::calculator::round_cents;
use super::strategy::{net_car_volume, GoodsType};
use super::{PricingError, PricingResult};

/// A client's itemised cargo line, reduced to what allocation reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductLine {
    pub id: Uuid,
    pub goods_type: GoodsType,
    pub tonnage: Option<Decimal>,
    pub volume: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProductAllocation {
    pub product_id: Uuid,
    pub goods_type: GoodsType,
    pub allocated_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationReport {
    pub shipment_price: Decimal,
    pub total_tonnage: Decimal,
    pub total_volume: Decimal,
    /// Metals and non-metals lines were both present. Each partition then
    /// carries the full shipment price on its own.
    pub mixed_goods_types: bool,
    pub allocations: Vec<ProductAllocation>,
}

/// Splits a shipment price across a client's products.
///
/// Metals lines share the price by tonnage, every other line by volume.
/// A partition whose weight sums to zero allocates zero to each of its lines.
pub fn allocate(
    shipment_price: Decimal,
    products: &[ProductLine],
) -> PricingResult<AllocationReport> {
    let (total_tonnage, total_volume) = products.iter().try_fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(tonnage, volume), p| {
            if p.goods_type == GoodsType::Metals {
                tonnage
                    .checked_add(p.tonnage.unwrap_or_default())
                    .map(|tonnage| (tonnage, volume))
                    .ok_or(PricingError::Overflow("total_tonnage"))
            } else {
                volume
                    .checked_add(p.volume)
                    .map(|volume| (tonnage, volume))
                    .ok_or(PricingError::Overflow("total_volume"))
            }
        },
    )?;

    let has_metals = products.iter().any(|p| p.goods_type == GoodsType::Metals);
    let has_other = products.iter().any(|p| p.goods_type != GoodsType::Metals);

    let allocations = products
        .iter()
        .map(|p| {
            let (weight, total) = if p.goods_type == GoodsType::Metals {
                (p.tonnage.unwrap_or_default(), total_tonnage)
            } else {
                (p.volume, total_volume)
            };
            let allocated_price = if total > Decimal::ZERO {
                weight
                    .checked_div(total)
                    .and_then(|share| share.checked_mul(shipment_price))
                    .map(round_cents)
                    .ok_or(PricingError::Overflow("allocated_price"))
            } else {
                Ok(Decimal::ZERO)
            };
            allocated_price.map(|allocated_price| ProductAllocation {
                product_id: p.id,
                goods_type: p.goods_type,
                allocated_price,
            })
        })
        .collect::<PricingResult<Vec<_>>>()?;

    Ok(AllocationReport {
        shipment_price,
        total_tonnage,
        total_volume,
        mixed_goods_types: has_metals && has_other,
        allocations,
    })
}

/// Dimensions and goods-type figures entered for a product.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProductMeasures {
    pub quantity: i32,
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
    pub volume_vide: Option<Decimal>,
    pub volume_used: Option<Decimal>,
}

/// Stored volume of a product line. Metals always carry zero volume.
pub fn product_volume(
    goods_type: GoodsType,
    measures: &ProductMeasures,
) -> PricingResult<Decimal> {
    match goods_type {
        GoodsType::Metals => Ok(Decimal::ZERO),
        GoodsType::Car => Ok(net_car_volume(
            measures.volume_vide.unwrap_or_default(),
            measures.volume_used.unwrap_or_default(),
        )),
        GoodsType::Merchandise => measures
            .length
            .checked_mul(measures.width)
            .and_then(|area| area.checked_mul(measures.height))
            .and_then(|volume| volume.checked_mul(Decimal::from(measures.quantity)))
            .ok_or(PricingError::Overflow("volume")),
    }
}
