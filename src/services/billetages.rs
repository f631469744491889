use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, ModelTrait, Set};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::couriers::collected_total;
use super::{find_billetage, find_courier, optional_text};
use crate::db::{with_transaction, DbPool};
use crate::errors::ServiceError;
use crate::models::billetage;
use crate::pricing::RawCell;
use crate::reconciliation::{
    reconcile, BalanceStatus, CashCount, Currency, RateBook, Reconciliation, ReconciliationError,
};

/// A counting session as submitted: one raw cell per note.
///
/// `{"counts": {"EUR": {"500": "2", "50": 3}}, "exchange_rates": {"KMF": 491.96775}}`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BilletageInput {
    #[serde(default)]
    pub courier_id: Option<Uuid>,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub counts: BTreeMap<Currency, BTreeMap<u32, RawCell>>,
    /// Units of each currency per reporting unit. Missing ones use the
    /// configured defaults.
    #[serde(default)]
    pub exchange_rates: BTreeMap<Currency, Decimal>,
    /// Ledger total, required unless a courier is linked.
    #[serde(default)]
    pub expected_amount: Option<Decimal>,
}

impl BilletageInput {
    pub fn cash_count(&self) -> Result<CashCount, ReconciliationError> {
        let mut count = CashCount::new();
        for (currency, notes) in &self.counts {
            for (face_value, raw) in notes {
                count.set_raw(*currency, *face_value, raw.as_str().unwrap_or_default())?;
            }
        }
        Ok(count)
    }
}

/// A stored counting session with its figures recomputed for display.
#[derive(Debug, Clone, Serialize)]
pub struct BilletageReport {
    pub id: Uuid,
    pub courier_id: Option<Uuid>,
    pub notes: Option<String>,
    pub reporting_currency: Currency,
    pub counts: CashCount,
    pub exchange_rates: BTreeMap<Currency, Decimal>,
    pub subtotals: BTreeMap<Currency, Decimal>,
    pub total_counted: Decimal,
    pub expected_amount: Decimal,
    pub difference: Decimal,
    pub status: BalanceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BilletageReport {
    fn from_model(model: billetage::Model, tolerance: Decimal) -> Result<Self, ServiceError> {
        let counts = model.cash_count()?;
        let exchange_rates: BTreeMap<Currency, Decimal> =
            serde_json::from_value(model.exchange_rates.clone())?;
        let reporting_currency = Currency::from_str(&model.reporting_currency).map_err(|_| {
            ServiceError::InternalError(format!(
                "stored reporting currency {:?} is not supported",
                model.reporting_currency
            ))
        })?;
        let subtotals = counts
            .currencies()
            .map(|currency| (currency, counts.subtotal(currency)))
            .collect();

        Ok(Self {
            status: model.status(tolerance),
            id: model.id,
            courier_id: model.courier_id,
            notes: model.notes,
            reporting_currency,
            counts,
            exchange_rates,
            subtotals,
            total_counted: model.total_counted,
            expected_amount: model.expected_amount,
            difference: model.difference,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Everything written onto a billetage row, computed before touching it.
struct Tally {
    courier_id: Option<Uuid>,
    notes: Option<String>,
    count: CashCount,
    result: Reconciliation,
}

impl Tally {
    fn apply(self, active: &mut billetage::ActiveModel) -> Result<(), ServiceError> {
        active.courier_id = Set(self.courier_id);
        active.notes = Set(self.notes);
        active.reporting_currency = Set(self.result.rates.reporting.to_string());
        active.counts = Set(serde_json::to_value(&self.count)?);
        active.exchange_rates = Set(serde_json::to_value(&self.result.rates.rates)?);
        active.total_counted = Set(self.result.total_counted);
        active.expected_amount = Set(self.result.expected_amount);
        active.difference = Set(self.result.difference);
        Ok(())
    }
}

async fn tally<C>(
    db: &C,
    rate_book: &RateBook,
    tolerance: Decimal,
    input: BilletageInput,
) -> Result<Tally, ServiceError>
where
    C: ConnectionTrait,
{
    let count = input.cash_count()?;
    let expected = match input.courier_id {
        Some(courier_id) => {
            let courier = find_courier(db, courier_id).await?;
            let collected = collected_total(db, &courier).await?;
            if let Some(submitted) = input.expected_amount.filter(|e| *e != collected) {
                debug!(%submitted, %collected, "Expected amount taken from courier items");
            }
            collected
        }
        None => input.expected_amount.ok_or_else(|| {
            ServiceError::ValidationError(
                "expected_amount is required when no courier is linked".to_string(),
            )
        })?,
    };

    let rates = rate_book.resolve(&input.exchange_rates, count.currencies())?;
    let result = reconcile(&count, &rates, expected, tolerance)?;
    Ok(Tally {
        courier_id: input.courier_id,
        notes: optional_text(input.notes),
        count,
        result,
    })
}

/// Cash counting sessions and their reconciliation.
#[derive(Clone)]
pub struct BilletageService {
    db_pool: Arc<DbPool>,
    rate_book: RateBook,
    tolerance: Decimal,
}

impl BilletageService {
    pub fn new(db_pool: Arc<DbPool>, rate_book: RateBook, tolerance: Decimal) -> Self {
        Self {
            db_pool,
            rate_book,
            tolerance,
        }
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: BilletageInput) -> Result<BilletageReport, ServiceError> {
        input.validate()?;
        let rate_book = self.rate_book.clone();
        let tolerance = self.tolerance;

        let model = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let tally = tally(txn, &rate_book, tolerance, input).await?;
                let mut active = <billetage::ActiveModel as Default>::default();
                tally.apply(&mut active)?;
                Ok(active.insert(txn).await?)
            })
        })
        .await?;

        info!(
            billetage_id = %model.id,
            total = %model.total_counted,
            difference = %model.difference,
            "Billetage recorded"
        );
        BilletageReport::from_model(model, self.tolerance)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<BilletageReport, ServiceError> {
        let model = find_billetage(&*self.db_pool, id).await?;
        BilletageReport::from_model(model, self.tolerance)
    }

    /// Replaces the counts and recomputes every total.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: BilletageInput) -> Result<BilletageReport, ServiceError> {
        input.validate()?;
        let rate_book = self.rate_book.clone();
        let tolerance = self.tolerance;

        let model = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let existing = find_billetage(txn, id).await?;
                let tally = tally(txn, &rate_book, tolerance, input).await?;
                let mut active: billetage::ActiveModel = existing.into();
                tally.apply(&mut active)?;
                Ok(active.update(txn).await?)
            })
        })
        .await?;

        info!(billetage_id = %id, difference = %model.difference, "Billetage updated");
        BilletageReport::from_model(model, self.tolerance)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let existing = find_billetage(db, id).await?;
        existing.delete(db).await?;
        Ok(())
    }
}
