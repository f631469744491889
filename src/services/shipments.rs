use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{
    find_client, find_container, find_shipment, optional_text, remove_client_if_orphaned,
    required_text, row_error,
};
use crate::db::{with_transaction, DbPool};
use crate::errors::ServiceError;
use crate::models::{client, container, shipment, PaymentStatus};
use crate::pricing::{GoodsInput, GoodsType, PricedGoods, PricingEngine, RawCell};

/// A new client and their share of a container.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddClientInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub mark: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub goods_type: Option<GoodsType>,
    #[serde(flatten)]
    pub goods: GoodsInput,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub paid_amount: Option<Decimal>,
    /// Accepted for form compatibility; the stored price is always derived.
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// Edits a shipment and its client. Absent goods figures keep their stored
/// value; the extra charge is always taken from the submission.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct EditShipmentInput {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub mark: Option<String>,
    pub phone: Option<String>,
    pub goods_type: Option<GoodsType>,
    #[serde(flatten)]
    pub goods: GoodsInput,
    pub payment_status: Option<PaymentStatus>,
    pub paid_amount: Option<Decimal>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInput {
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub paid_amount: Option<Decimal>,
}

/// One spreadsheet row, as raw cells.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportRow {
    #[serde(default)]
    pub mark: RawCell,
    #[serde(default)]
    pub name: RawCell,
    #[serde(default)]
    pub phone: RawCell,
    #[serde(default)]
    pub goods_type: RawCell,
    #[serde(default)]
    pub volume: RawCell,
    #[serde(default)]
    pub tonnage: RawCell,
    #[serde(default)]
    pub price_per_tonne: RawCell,
    #[serde(default)]
    pub volume_vide: RawCell,
    #[serde(default)]
    pub volume_used: RawCell,
    #[serde(default)]
    pub extra_charge: RawCell,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientShipment {
    pub client: client::Model,
    pub shipment: shipment::Model,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentRemoval {
    pub shipment_id: Uuid,
    pub client_removed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub container_id: Uuid,
    pub imported: Vec<ClientShipment>,
}

/// The client fields of an import row plus its priced goods.
#[derive(Debug, Clone, PartialEq)]
struct ParsedRow {
    name: String,
    mark: String,
    phone: Option<String>,
    goods_type: GoodsType,
    goods: GoodsInput,
}

/// Spreadsheets store phone numbers as floats ("269331234.0").
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let digits = trimmed.split('.').next().unwrap_or(trimmed).trim();
    if digits.is_empty() {
        None
    } else {
        Some(digits.to_string())
    }
}

impl ImportRow {
    /// `row` is 1-based and only used in error messages.
    fn parse(&self, row: usize) -> Result<ParsedRow, ServiceError> {
        let mark = self
            .mark
            .text()
            .ok_or_else(|| row_error(row, "mark is required"))?;
        let name = self.name.text().unwrap_or_else(|| mark.clone());
        let goods_type = match self.goods_type.text() {
            Some(text) => GoodsType::from_str(&text)
                .map_err(|_| row_error(row, format!("unknown goods type {text:?}")))?,
            None => GoodsType::Merchandise,
        };
        let goods = GoodsInput {
            volume: self.volume.optional_decimal("volume").map_err(|e| row_error(row, e))?,
            volume_vide: self
                .volume_vide
                .optional_decimal("volume_vide")
                .map_err(|e| row_error(row, e))?,
            volume_used: self
                .volume_used
                .optional_decimal("volume_used")
                .map_err(|e| row_error(row, e))?,
            tonnage: self.tonnage.optional_decimal("tonnage").map_err(|e| row_error(row, e))?,
            price_per_tonne: self
                .price_per_tonne
                .optional_decimal("price_per_tonne")
                .map_err(|e| row_error(row, e))?,
            extra_charge: self
                .extra_charge
                .decimal_or_zero("extra_charge")
                .map_err(|e| row_error(row, e))?,
        };

        Ok(ParsedRow {
            name,
            mark,
            phone: self.phone.as_str().and_then(normalize_phone),
            goods_type,
            goods,
        })
    }
}

/// Merges an edit over the stored figures.
fn merged_goods(stored: &shipment::Model, submitted: &GoodsInput) -> GoodsInput {
    let base = stored.goods_input();
    GoodsInput {
        volume: submitted.volume.or(base.volume),
        volume_vide: submitted.volume_vide.or(base.volume_vide),
        volume_used: submitted.volume_used.or(base.volume_used),
        tonnage: submitted.tonnage.or(base.tonnage),
        price_per_tonne: submitted.price_per_tonne.or(base.price_per_tonne),
        extra_charge: submitted.extra_charge,
    }
}

async fn insert_client_shipment<C>(
    db: &C,
    container: &container::Model,
    client: client::ActiveModel,
    priced: &PricedGoods,
    payment_status: PaymentStatus,
    paid_amount: Decimal,
) -> Result<ClientShipment, ServiceError>
where
    C: ConnectionTrait,
{
    let client = client.insert(db).await?;
    let mut active = shipment::ActiveModel {
        client_id: Set(client.id),
        container_id: Set(container.id),
        payment_status: Set(payment_status),
        paid_amount: Set(paid_amount),
        ..Default::default()
    };
    active.apply_pricing(priced);
    let shipment = active.insert(db).await?;

    Ok(ClientShipment {
        total_price: shipment.total_price(),
        client,
        shipment,
    })
}

/// Client shares of containers: creation, edits, payments and bulk import.
#[derive(Clone)]
pub struct ShipmentService {
    db_pool: Arc<DbPool>,
    engine: PricingEngine,
}

impl ShipmentService {
    pub fn new(db_pool: Arc<DbPool>, engine: PricingEngine) -> Self {
        Self { db_pool, engine }
    }

    /// Creates a client and prices their shipment against the container.
    #[instrument(skip(self, input), fields(mark = %input.mark))]
    pub async fn add_client(
        &self,
        container_id: Uuid,
        input: AddClientInput,
    ) -> Result<ClientShipment, ServiceError> {
        input.validate()?;
        let engine = self.engine;

        let created = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let container = find_container(txn, container_id).await?;
                let goods_type = input.goods_type.unwrap_or(GoodsType::Merchandise);
                let priced = engine.price(goods_type, &container.terms(), &input.goods)?;
                if let Some(submitted) = input.price {
                    if submitted != priced.price {
                        debug!(%submitted, derived = %priced.price, "Ignoring submitted shipment price");
                    }
                }
                let paid_amount = input.payment_status.paid_amount(input.paid_amount, priced.price)?;

                let client = client::ActiveModel {
                    name: Set(required_text("name", &input.name)?),
                    mark: Set(required_text("mark", &input.mark)?),
                    phone: Set(optional_text(input.phone)),
                    ..Default::default()
                };
                insert_client_shipment(
                    txn,
                    &container,
                    client,
                    &priced,
                    input.payment_status,
                    paid_amount,
                )
                .await
            })
        })
        .await?;

        info!(
            shipment_id = %created.shipment.id,
            container_id = %container_id,
            price = %created.shipment.price,
            "Client added to container"
        );
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<ClientShipment, ServiceError> {
        let db = &*self.db_pool;
        let shipment = find_shipment(db, id).await?;
        let client = find_client(db, shipment.client_id).await?;
        Ok(ClientShipment {
            total_price: shipment.total_price(),
            client,
            shipment,
        })
    }

    /// Re-prices a shipment from the submitted figures and updates its client.
    #[instrument(skip(self, input))]
    pub async fn edit(&self, id: Uuid, input: EditShipmentInput) -> Result<ClientShipment, ServiceError> {
        input.validate()?;
        let engine = self.engine;

        with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let existing = find_shipment(txn, id).await?;
                let container = find_container(txn, existing.container_id).await?;
                let client = find_client(txn, existing.client_id).await?;

                let goods_type = input.goods_type.unwrap_or(existing.goods_type);
                let goods = merged_goods(&existing, &input.goods);
                let priced = engine.price(goods_type, &container.terms(), &goods)?;
                if let Some(submitted) = input.price {
                    if submitted != priced.price {
                        debug!(%submitted, derived = %priced.price, "Ignoring submitted shipment price");
                    }
                }

                let status = input.payment_status.unwrap_or(existing.payment_status);
                let submitted_paid = input.paid_amount.or_else(|| {
                    (status == existing.payment_status).then_some(existing.paid_amount)
                });
                let paid_amount = status.paid_amount(submitted_paid, priced.price)?;

                let mut client: client::ActiveModel = client.into();
                if let Some(name) = input.name {
                    client.name = Set(required_text("name", &name)?);
                }
                if let Some(mark) = input.mark {
                    client.mark = Set(required_text("mark", &mark)?);
                }
                if let Some(phone) = input.phone {
                    client.phone = Set(optional_text(Some(phone)));
                }
                let client = client.update(txn).await?;

                let mut active: shipment::ActiveModel = existing.into();
                active.apply_pricing(&priced);
                active.payment_status = Set(status);
                active.paid_amount = Set(paid_amount);
                let shipment = active.update(txn).await?;

                Ok(ClientShipment {
                    total_price: shipment.total_price(),
                    client,
                    shipment,
                })
            })
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn update_payment(
        &self,
        id: Uuid,
        input: PaymentInput,
    ) -> Result<shipment::Model, ServiceError> {
        let db = &*self.db_pool;
        let existing = find_shipment(db, id).await?;
        let paid_amount = input
            .payment_status
            .paid_amount(input.paid_amount, existing.price)?;

        let mut active: shipment::ActiveModel = existing.into();
        active.payment_status = Set(input.payment_status);
        active.paid_amount = Set(paid_amount);
        let updated = active.update(db).await?;

        info!(shipment_id = %id, status = %updated.payment_status, paid = %updated.paid_amount, "Payment updated");
        Ok(updated)
    }

    /// Deletes a shipment; its client goes too when nothing else references it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<ShipmentRemoval, ServiceError> {
        with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let shipment = find_shipment(txn, id).await?;
                let client_id = shipment.client_id;
                shipment::Entity::delete_by_id(id).exec(txn).await?;
                let client_removed = remove_client_if_orphaned(txn, client_id).await?;
                Ok(ShipmentRemoval {
                    shipment_id: id,
                    client_removed,
                })
            })
        })
        .await
    }

    /// Imports spreadsheet rows into one container. Every row creates a new
    /// client. The batch is all-or-nothing; errors name the 1-based row.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn import_rows(
        &self,
        container_id: Uuid,
        rows: Vec<ImportRow>,
    ) -> Result<ImportSummary, ServiceError> {
        if rows.is_empty() {
            return Err(ServiceError::ValidationError("no rows to import".to_string()));
        }
        let parsed = rows
            .iter()
            .enumerate()
            .map(|(index, row)| row.parse(index + 1))
            .collect::<Result<Vec<_>, _>>()?;
        let engine = self.engine;

        let summary = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let container = find_container(txn, container_id).await?;
                let terms = container.terms();
                let mut imported = Vec::with_capacity(parsed.len());

                for (index, row) in parsed.into_iter().enumerate() {
                    let priced = engine
                        .price(row.goods_type, &terms, &row.goods)
                        .map_err(|e| row_error(index + 1, e))?;
                    let client = client::ActiveModel {
                        name: Set(row.name),
                        mark: Set(row.mark),
                        phone: Set(row.phone),
                        ..Default::default()
                    };
                    imported.push(
                        insert_client_shipment(
                            txn,
                            &container,
                            client,
                            &priced,
                            PaymentStatus::Unpaid,
                            Decimal::ZERO,
                        )
                        .await?,
                    );
                }

                Ok(ImportSummary {
                    container_id,
                    imported,
                })
            })
        })
        .await?;

        counter!("freight.import.rows", summary.imported.len() as u64);
        info!(container_id = %container_id, imported = summary.imported.len(), "Rows imported");
        Ok(summary)
    }
}
