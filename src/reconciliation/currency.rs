use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString};
use tracing::info;

use super::ReconciliationError;
use crate::config::BilletageConfig;

/// Currencies handled at the counter.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Currency {
    #[serde(rename = "EUR", alias = "eur")]
    #[strum(serialize = "EUR")]
    Eur,
    #[serde(rename = "AED", alias = "aed")]
    #[strum(serialize = "AED")]
    Aed,
    #[serde(rename = "KMF", alias = "kmf")]
    #[strum(serialize = "KMF")]
    Kmf,
}

impl Currency {
    /// Banknote face values accepted for this currency, largest first.
    pub fn denominations(self) -> &'static [u32] {
        match self {
            Currency::Eur => &[500, 200, 100, 50, 20, 10, 5],
            Currency::Aed => &[1000, 500, 200, 100, 50, 20, 10, 5],
            Currency::Kmf => &[10000, 5000, 2000, 1000, 500],
        }
    }

    pub fn accepts(self, face_value: u32) -> bool {
        self.denominations().contains(&face_value)
    }
}

/// Exchange rates resolved for one count, expressed as units of the foreign
/// currency per one unit of the reporting currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRates {
    pub reporting: Currency,
    pub rates: BTreeMap<Currency, Decimal>,
}

impl ResolvedRates {
    pub fn rate(&self, currency: Currency) -> Decimal {
        if currency == self.reporting {
            return Decimal::ONE;
        }
        self.rates.get(&currency).copied().unwrap_or(Decimal::ONE)
    }

    /// Converts an amount in `currency` into the reporting currency.
    ///
    /// `None` when the quotient leaves the `Decimal` range.
    pub fn to_reporting(&self, currency: Currency, amount: Decimal) -> Option<Decimal> {
        amount.checked_div(self.rate(currency))
    }
}

/// Reporting currency plus the configured fallback rates.
#[derive(Debug, Clone, PartialEq)]
pub struct RateBook {
    reporting: Currency,
    defaults: BTreeMap<Currency, Decimal>,
}

impl RateBook {
    pub fn new(reporting: Currency, defaults: BTreeMap<Currency, Decimal>) -> Self {
        Self {
            reporting,
            defaults,
        }
    }

    pub fn reporting(&self) -> Currency {
        self.reporting
    }

    /// Resolves a rate for every currency in `in_use`, preferring the
    /// submitted one. A missing submitted rate silently falls back to the
    /// configured default.
    pub fn resolve<I>(
        &self,
        submitted: &BTreeMap<Currency, Decimal>,
        in_use: I,
    ) -> Result<ResolvedRates, ReconciliationError>
    where
        I: IntoIterator<Item = Currency>,
    {
        let mut rates = BTreeMap::new();
        for currency in in_use {
            if currency == self.reporting || rates.contains_key(&currency) {
                continue;
            }
            let rate = match submitted.get(&currency) {
                Some(rate) => *rate,
                None => {
                    let rate = *self
                        .defaults
                        .get(&currency)
                        .ok_or(ReconciliationError::MissingRate(currency))?;
                    info!(currency = %currency, rate = %rate, "Exchange rate not supplied, using configured default");
                    rate
                }
            };
            if rate <= Decimal::ZERO {
                return Err(ReconciliationError::InvalidRate { currency, rate });
            }
            rates.insert(currency, rate);
        }
        Ok(ResolvedRates {
            reporting: self.reporting,
            rates,
        })
    }
}

impl From<&BilletageConfig> for RateBook {
    fn from(cfg: &BilletageConfig) -> Self {
        Self::new(cfg.reporting_currency(), cfg.rates())
    }
}
