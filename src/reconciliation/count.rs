use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::currency::Currency;
use super::ReconciliationError;
use crate::pricing::numeric::parse_count;

/// Banknote counts per currency and face value.
///
/// Only denominations listed by [`Currency::denominations`] are accepted.
/// Serialises as `{"EUR": {"500": 2, "50": 1}, ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CashCount(BTreeMap<Currency, BTreeMap<u32, u32>>);

impl CashCount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `count` notes of `face_value`. A zero count clears the entry.
    pub fn set(
        &mut self,
        currency: Currency,
        face_value: u32,
        count: u32,
    ) -> Result<(), ReconciliationError> {
        if !currency.accepts(face_value) {
            return Err(ReconciliationError::UnknownDenomination {
                currency,
                face_value,
            });
        }
        let notes = self.0.entry(currency).or_default();
        if count == 0 {
            notes.remove(&face_value);
            if notes.is_empty() {
                self.0.remove(&currency);
            }
        } else {
            notes.insert(face_value, count);
        }
        Ok(())
    }

    pub fn with(
        mut self,
        currency: Currency,
        face_value: u32,
        count: u32,
    ) -> Result<Self, ReconciliationError> {
        self.set(currency, face_value, count)?;
        Ok(self)
    }

    /// Records a count typed into a form cell. Blank cells count as zero.
    pub fn set_raw(
        &mut self,
        currency: Currency,
        face_value: u32,
        raw: &str,
    ) -> Result<(), ReconciliationError> {
        let field = format!("{currency}_{face_value}");
        let count = parse_count(&field, raw)?;
        self.set(currency, face_value, count)
    }

    /// Re-checks every denomination, for counts that arrived deserialised.
    pub fn validate(&self) -> Result<(), ReconciliationError> {
        for (currency, notes) in &self.0 {
            if let Some(face_value) = notes.keys().find(|face| !currency.accepts(**face)) {
                return Err(ReconciliationError::UnknownDenomination {
                    currency: *currency,
                    face_value: *face_value,
                });
            }
        }
        Ok(())
    }

    pub fn count(&self, currency: Currency, face_value: u32) -> u32 {
        self.0
            .get(&currency)
            .and_then(|notes| notes.get(&face_value))
            .copied()
            .unwrap_or(0)
    }

    /// Face-value total for one currency, in that currency.
    pub fn subtotal(&self, currency: Currency) -> Decimal {
        self.0
            .get(&currency)
            .map(|notes| {
                notes
                    .iter()
                    .map(|(face, count)| Decimal::from(*face) * Decimal::from(*count))
                    .sum()
            })
            .unwrap_or(Decimal::ZERO)
    }

    /// Currencies with at least one note counted.
    pub fn currencies(&self) -> impl Iterator<Item = Currency> + '_ {
        self.0
            .iter()
            .filter(|(_, notes)| notes.values().any(|count| *count > 0))
            .map(|(currency, _)| *currency)
    }

    pub fn is_empty(&self) -> bool {
        self.currencies().next().is_none()
    }
}
