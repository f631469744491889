//! Cash reconciliation ("billetage").
//!
//! A counting session records banknotes per currency, converts them into the
//! reporting currency and compares the result with the ledger total.

pub mod count;
pub mod currency;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::Display;
use thiserror::Error;

pub use count::CashCount;
pub use currency::{Currency, RateBook, ResolvedRates};

use crate::pricing::{round_cents, NumericError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconciliationError {
    #[error(transparent)]
    Numeric(#[from] NumericError),

    #[error("{currency} has no {face_value} note")]
    UnknownDenomination { currency: Currency, face_value: u32 },

    #[error("no exchange rate available for {0}")]
    MissingRate(Currency),

    #[error("exchange rate for {currency} must be greater than zero (got {rate})")]
    InvalidRate { currency: Currency, rate: Decimal },

    #[error("expected amount must not be negative (got {0})")]
    NegativeExpected(Decimal),

    #[error("{0} total is too large to compute")]
    Overflow(Currency),
}

/// Presentation of a difference. Not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BalanceStatus {
    Balanced,
    Surplus,
    Shortage,
}

impl BalanceStatus {
    /// Classifies `difference`; anything within `tolerance` of zero balances.
    pub fn classify(difference: Decimal, tolerance: Decimal) -> Self {
        let tolerance = tolerance.abs();
        if difference.abs() <= tolerance {
            BalanceStatus::Balanced
        } else if difference > Decimal::ZERO {
            BalanceStatus::Surplus
        } else {
            BalanceStatus::Shortage
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    /// Face-value totals in each counted currency's own units.
    pub subtotals: BTreeMap<Currency, Decimal>,
    pub rates: ResolvedRates,
    pub total_counted: Decimal,
    pub expected_amount: Decimal,
    pub difference: Decimal,
    pub status: BalanceStatus,
}

/// Totals a cash count and compares it with `expected_amount`.
///
/// `difference` is always `total_counted - expected_amount`, both rounded to
/// cents first.
pub fn reconcile(
    count: &CashCount,
    rates: &ResolvedRates,
    expected_amount: Decimal,
    tolerance: Decimal,
) -> Result<Reconciliation, ReconciliationError> {
    count.validate()?;
    if expected_amount < Decimal::ZERO {
        return Err(ReconciliationError::NegativeExpected(expected_amount));
    }

    let subtotals: BTreeMap<Currency, Decimal> = count
        .currencies()
        .map(|currency| (currency, count.subtotal(currency)))
        .collect();

    let total_counted = subtotals
        .iter()
        .try_fold(Decimal::ZERO, |total, (currency, amount)| {
            rates
                .to_reporting(*currency, *amount)
                .and_then(|converted| total.checked_add(converted))
                .ok_or(ReconciliationError::Overflow(*currency))
        })
        .map(round_cents)?;
    let expected_amount = round_cents(expected_amount);
    let difference = total_counted - expected_amount;

    Ok(Reconciliation {
        subtotals,
        rates: rates.clone(),
        total_counted,
        expected_amount,
        difference,
        status: BalanceStatus::classify(difference, tolerance),
    })
}
