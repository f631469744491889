use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{PricingError, PricingResult};

/// Smallest container volume used as a divisor.
pub const DEFAULT_MIN_CONTAINER_VOLUME: Decimal = dec!(0.001);

/// Rounds to whole currency units, half to even.
pub fn round_price(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
}

/// Rounds to two decimal places, half to even.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Result of pricing one client's share of a container.
///
/// `base_price` excludes the extra charge; `total_price` includes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base_price: Decimal,
    pub total_price: Decimal,
}

/// Proportional container pricing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceCalculator {
    min_container_volume: Decimal,
}

impl Default for PriceCalculator {
    fn default() -> Self {
        Self {
            min_container_volume: DEFAULT_MIN_CONTAINER_VOLUME,
        }
    }
}

impl PriceCalculator {
    /// A non-positive floor falls back to [`DEFAULT_MIN_CONTAINER_VOLUME`].
    pub fn new(min_container_volume: Decimal) -> Self {
        if min_container_volume > Decimal::ZERO {
            Self {
                min_container_volume,
            }
        } else {
            Self::default()
        }
    }

    pub fn min_container_volume(&self) -> Decimal {
        self.min_container_volume
    }

    /// Container volume actually used as the divisor.
    pub fn effective_volume(&self, container_volume: Decimal) -> Decimal {
        container_volume.max(self.min_container_volume)
    }

    /// `base = round(price * client_volume / volume)`, `total = round(base + extra)`.
    ///
    /// Figures whose product leaves the `Decimal` range are reported as
    /// [`PricingError::Overflow`].
    pub fn calculate(
        &self,
        container_price: Decimal,
        container_volume: Decimal,
        client_volume: Decimal,
        extra_charge: Decimal,
    ) -> PricingResult<PriceBreakdown> {
        let effective = self.effective_volume(container_volume);
        let base_price = client_volume
            .checked_div(effective)
            .and_then(|share| container_price.checked_mul(share))
            .map(round_price)
            .ok_or(PricingError::Overflow("price"))?;
        let total_price = base_price
            .checked_add(extra_charge)
            .map(round_price)
            .ok_or(PricingError::Overflow("total_price"))?;
        Ok(PriceBreakdown {
            base_price,
            total_price,
        })
    }
}
