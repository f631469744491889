use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use super::{PricingError, PricingResult};
use crate::config::PricingConfig;

/// Tonne to cubic-metre factors per container size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionFactors {
    pub default: Decimal,
    pub twenty_ft: Option<Decimal>,
    pub forty_ft: Option<Decimal>,
}

impl Default for ConversionFactors {
    fn default() -> Self {
        Self {
            default: Decimal::ONE,
            twenty_ft: None,
            forty_ft: None,
        }
    }
}

/// Converts freight tonnage into cubic metres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UnitConverter {
    factors: ConversionFactors,
}

impl UnitConverter {
    pub fn new(factors: ConversionFactors) -> Self {
        Self { factors }
    }

    pub fn factors(&self) -> &ConversionFactors {
        &self.factors
    }

    /// Picks the multiplier for a container-type label.
    ///
    /// Labels containing "20" use the 20ft factor, labels containing "40"
    /// the 40ft factor. An unset or zero override, a missing label and an
    /// unrecognised label all resolve to the default factor.
    pub fn tonne_to_m3_factor(&self, container_type: Option<&str>) -> Decimal {
        let Some(label) = container_type else {
            return self.factors.default;
        };

        if label.contains("20") {
            self.or_default(self.factors.twenty_ft)
        } else if label.contains("40") {
            self.or_default(self.factors.forty_ft)
        } else {
            debug!(container_type = label, "Unrecognised container type, using default tonne factor");
            self.factors.default
        }
    }

    pub fn tonnes_to_m3(
        &self,
        tonnage: Decimal,
        container_type: Option<&str>,
    ) -> PricingResult<Decimal> {
        tonnage
            .checked_mul(self.tonne_to_m3_factor(container_type))
            .ok_or(PricingError::Overflow("volume"))
    }

    fn or_default(&self, factor: Option<Decimal>) -> Decimal {
        match factor {
            Some(f) if !f.is_zero() => f,
            _ => self.factors.default,
        }
    }
}

impl From<&PricingConfig> for UnitConverter {
    fn from(cfg: &PricingConfig) -> Self {
        let default = Decimal::from_f64(cfg.tonne_to_m3_default).unwrap_or(Decimal::ONE);
        Self::new(ConversionFactors {
            default,
            twenty_ft: cfg.tonne_to_m3_20ft.and_then(Decimal::from_f64),
            forty_ft: cfg.tonne_to_m3_40ft.and_then(Decimal::from_f64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn converter() -> UnitConverter {
        UnitConverter::new(ConversionFactors {
            default: dec!(1.5),
            twenty_ft: Some(dec!(1.2)),
            forty_ft: Some(dec!(1.8)),
        })
    }

    #[rstest]
    #[case(Some("20ft"), dec!(1.2))]
    #[case(Some("Dry 20 standard"), dec!(1.2))]
    #[case(Some("40ft"), dec!(1.8))]
    #[case(Some("40HC"), dec!(1.8))]
    #[case(Some("reefer"), dec!(1.5))]
    #[case(Some(""), dec!(1.5))]
    #[case(None, dec!(1.5))]
    fn factor_by_label(#[case] label: Option<&str>, #[case] expected: Decimal) {
        assert_eq!(converter().tonne_to_m3_factor(label), expected);
    }

    #[test]
    fn unset_or_zero_override_falls_back_to_default() {
        let conv = UnitConverter::new(ConversionFactors {
            default: dec!(2),
            twenty_ft: Some(Decimal::ZERO),
            forty_ft: None,
        });
        assert_eq!(conv.tonne_to_m3_factor(Some("20ft")), dec!(2));
        assert_eq!(conv.tonne_to_m3_factor(Some("40ft")), dec!(2));
    }

    #[test]
    fn twenty_wins_when_label_mentions_both() {
        assert_eq!(converter().tonne_to_m3_factor(Some("20/40")), dec!(1.2));
    }

    #[test]
    fn converts_tonnage() {
        assert_eq!(converter().tonnes_to_m3(dec!(2.5), Some("40ft")), Ok(dec!(4.50)));
        assert_eq!(
            converter().tonnes_to_m3(Decimal::MAX, Some("40ft")),
            Err(PricingError::Overflow("volume"))
        );
    }

    #[test]
    fn built_from_pricing_config() {
        let cfg = PricingConfig {
            tonne_to_m3_default: 1.5,
            tonne_to_m3_20ft: Some(1.25),
            tonne_to_m3_40ft: None,
            min_container_volume: 0.001,
        };
        let conv = UnitConverter::from(&cfg);
        assert_eq!(conv.tonne_to_m3_factor(Some("20ft")), dec!(1.25));
        assert_eq!(conv.tonne_to_m3_factor(Some("40ft")), dec!(1.5));
    }
}
