use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::calculator::PriceCalculator;
use super::strategy::PricingMode;
use super::PricingResult;

/// The fields of a stored shipment that repricing reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipmentSnapshot {
    pub id: Uuid,
    pub pricing_mode: PricingMode,
    pub volume: Decimal,
    pub extra_charge: Decimal,
    pub price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RepricedShipment {
    pub shipment_id: Uuid,
    pub previous_price: Decimal,
    pub price: Decimal,
}

/// What a container price/volume change does to its shipments.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecalculationPlan {
    pub repriced: Vec<RepricedShipment>,
    /// Manually priced shipments left as they are.
    pub skipped: Vec<Uuid>,
}

impl RecalculationPlan {
    pub fn changed(&self) -> impl Iterator<Item = &RepricedShipment> {
        self.repriced.iter().filter(|r| r.price != r.previous_price)
    }
}

/// Whether an edit to a container affects shipment prices.
pub fn terms_changed(
    old_price: Decimal,
    old_volume: Decimal,
    new_price: Decimal,
    new_volume: Decimal,
) -> bool {
    old_price != new_price || old_volume != new_volume
}

/// Re-derives the stored price of every proportionally priced shipment.
///
/// The stored price is the base price: the extra charge stays a separate
/// field and is not folded in. One shipment out of range fails the whole plan.
pub fn plan_recalculation<I>(
    calculator: &PriceCalculator,
    container_price: Decimal,
    container_volume: Decimal,
    shipments: I,
) -> PricingResult<RecalculationPlan>
where
    I: IntoIterator<Item = ShipmentSnapshot>,
{
    let mut plan = RecalculationPlan::default();
    for shipment in shipments {
        match shipment.pricing_mode {
            PricingMode::ManualPerTonne => plan.skipped.push(shipment.id),
            PricingMode::Proportional => {
                let breakdown = calculator.calculate(
                    container_price,
                    container_volume,
                    shipment.volume,
                    shipment.extra_charge,
                )?;
                plan.repriced.push(RepricedShipment {
                    shipment_id: shipment.id,
                    previous_price: shipment.price,
                    price: breakdown.base_price,
                });
            }
        }
    }
    Ok(plan)
}
