use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::{
    at_row, find_client, find_product, find_shipment, non_negative, required_text, row_error,
};
use crate::db::{with_transaction, DbPool};
use crate::errors::ServiceError;
use crate::models::product;
use crate::pricing::{
    allocate, product_volume, AllocationReport, GoodsType, ProductMeasures, RawCell,
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 128))]
    pub reference: String,
    #[serde(default)]
    pub goods_type: Option<GoodsType>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub length: Decimal,
    #[serde(default)]
    pub width: Decimal,
    #[serde(default)]
    pub height: Decimal,
    #[serde(default)]
    pub tonnage: Option<Decimal>,
    #[serde(default)]
    pub volume_vide: Option<Decimal>,
    #[serde(default)]
    pub volume_used: Option<Decimal>,
}

impl ProductInput {
    fn measures(&self) -> Result<ProductMeasures, ServiceError> {
        Ok(ProductMeasures {
            quantity: self.quantity,
            length: non_negative("length", self.length)?,
            width: non_negative("width", self.width)?,
            height: non_negative("height", self.height)?,
            volume_vide: self.volume_vide.map(|v| non_negative("volume_vide", v)).transpose()?,
            volume_used: self.volume_used.map(|v| non_negative("volume_used", v)).transpose()?,
        })
    }

    fn tonnage(&self) -> Result<Option<Decimal>, ServiceError> {
        self.tonnage.map(|t| non_negative("tonnage", t)).transpose()
    }

    /// A new product row for `client_id`. The goods type defaults to merchandise.
    fn new_product(&self, client_id: Uuid) -> Result<product::ActiveModel, ServiceError> {
        self.validate()?;
        let goods_type = self.goods_type.unwrap_or(GoodsType::Merchandise);
        let measures = self.measures()?;
        Ok(product::ActiveModel {
            client_id: Set(client_id),
            reference: Set(required_text("reference", &self.reference)?),
            goods_type: Set(goods_type),
            quantity: Set(measures.quantity),
            length: Set(measures.length),
            width: Set(measures.width),
            height: Set(measures.height),
            tonnage: Set(self.tonnage()?),
            volume_vide: Set(measures.volume_vide),
            volume_used: Set(measures.volume_used),
            volume: Set(product_volume(goods_type, &measures)?),
            ..Default::default()
        })
    }
}

/// One row of a product spreadsheet upload.
///
/// Cells are kept raw so that numbers typed as text and numbers stored as
/// floats go through the same parsing. Blank dimensions count as zero.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductImportRow {
    #[serde(default)]
    pub reference: RawCell,
    #[serde(default)]
    pub goods_type: RawCell,
    #[serde(default)]
    pub quantity: RawCell,
    #[serde(default)]
    pub length: RawCell,
    #[serde(default)]
    pub width: RawCell,
    #[serde(default)]
    pub height: RawCell,
    #[serde(default)]
    pub tonnage: RawCell,
    #[serde(default)]
    pub volume_vide: RawCell,
    #[serde(default)]
    pub volume_used: RawCell,
}

impl ProductImportRow {
    /// `row` is 1-based and only used in error messages.
    fn parse(&self, row: usize) -> Result<ProductInput, ServiceError> {
        let reference = self
            .reference
            .text()
            .ok_or_else(|| row_error(row, "reference is required"))?;
        let goods_type = match self.goods_type.text() {
            Some(text) => Some(
                GoodsType::from_str(&text)
                    .map_err(|_| row_error(row, format!("unknown goods type {text:?}")))?,
            ),
            None => None,
        };
        let quantity = self.quantity.count("quantity").map_err(|e| row_error(row, e))?;
        let quantity = i32::try_from(quantity)
            .map_err(|_| row_error(row, format!("quantity is too large (got {quantity})")))?;

        let decimal = |cell: &RawCell, field: &str| {
            cell.decimal_or_zero(field).map_err(|e| row_error(row, e))
        };
        let optional = |cell: &RawCell, field: &str| {
            cell.optional_decimal(field).map_err(|e| row_error(row, e))
        };

        Ok(ProductInput {
            reference,
            goods_type,
            quantity,
            length: decimal(&self.length, "length")?,
            width: decimal(&self.width, "width")?,
            height: decimal(&self.height, "height")?,
            tonnage: optional(&self.tonnage, "tonnage")?,
            volume_vide: optional(&self.volume_vide, "volume_vide")?,
            volume_used: optional(&self.volume_used, "volume_used")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductImport {
    pub client_id: Uuid,
    pub imported: Vec<product::Model>,
}

/// A shipment price split across the client's products.
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentAllocation {
    pub shipment_id: Uuid,
    pub client_id: Uuid,
    #[serde(flatten)]
    pub report: AllocationReport,
}

/// A client's itemised cargo lines.
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn add(&self, client_id: Uuid, input: ProductInput) -> Result<product::Model, ServiceError> {
        let active = input.new_product(client_id)?;
        let db = &*self.db_pool;
        find_client(db, client_id).await?;
        let model = active.insert(db).await?;

        info!(product_id = %model.id, client_id = %client_id, goods_type = %model.goods_type, "Product added");
        Ok(model)
    }

    /// Imports spreadsheet rows as products of one client. The batch is
    /// all-or-nothing; errors name the 1-based row.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn import_rows(
        &self,
        client_id: Uuid,
        rows: Vec<ProductImportRow>,
    ) -> Result<ProductImport, ServiceError> {
        if rows.is_empty() {
            return Err(ServiceError::ValidationError("no rows to import".to_string()));
        }
        let products = rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                row.parse(index + 1)?
                    .new_product(client_id)
                    .map_err(|e| at_row(index + 1, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let summary = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                find_client(txn, client_id).await?;
                let mut imported = Vec::with_capacity(products.len());
                for product in products {
                    imported.push(product.insert(txn).await?);
                }
                Ok(ProductImport {
                    client_id,
                    imported,
                })
            })
        })
        .await?;

        counter!("freight.import.products", summary.imported.len() as u64);
        info!(client_id = %client_id, imported = summary.imported.len(), "Products imported");
        Ok(summary)
    }

    /// Updates a product's measures. The goods type set at creation is kept.
    #[instrument(skip(self))]
    pub async fn edit(&self, id: Uuid, input: ProductInput) -> Result<product::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let existing = find_product(db, id).await?;
        let goods_type = existing.goods_type;
        if let Some(submitted) = input.goods_type.filter(|g| *g != goods_type) {
            debug!(product_id = %id, kept = %goods_type, %submitted, "Ignoring goods type change");
        }

        let measures = input.measures()?;
        let mut active: product::ActiveModel = existing.into();
        active.reference = Set(required_text("reference", &input.reference)?);
        active.quantity = Set(measures.quantity);
        active.length = Set(measures.length);
        active.width = Set(measures.width);
        active.height = Set(measures.height);
        active.tonnage = Set(input.tonnage()?);
        active.volume_vide = Set(measures.volume_vide);
        active.volume_used = Set(measures.volume_used);
        active.volume = Set(product_volume(goods_type, &measures)?);
        Ok(active.update(db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let existing = find_product(db, id).await?;
        existing.delete(db).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_for_client(&self, client_id: Uuid) -> Result<Vec<product::Model>, ServiceError> {
        let db = &*self.db_pool;
        find_client(db, client_id).await?;
        Ok(product::Entity::find()
            .filter(product::Column::ClientId.eq(client_id))
            .order_by_asc(product::Column::CreatedAt)
            .all(db)
            .await?)
    }

    /// Splits the shipment's stored price across every product of its client.
    #[instrument(skip(self))]
    pub async fn allocation_for_shipment(
        &self,
        shipment_id: Uuid,
    ) -> Result<ShipmentAllocation, ServiceError> {
        let db = &*self.db_pool;
        let shipment = find_shipment(db, shipment_id).await?;
        let products = product::Entity::find()
            .filter(product::Column::ClientId.eq(shipment.client_id))
            .order_by_asc(product::Column::CreatedAt)
            .all(db)
            .await?;
        let lines: Vec<_> = products.iter().map(product::Model::line).collect();
        let report = allocate(shipment.price, &lines)?;

        if report.mixed_goods_types {
            warn!(
                shipment_id = %shipment_id,
                client_id = %shipment.client_id,
                "Client has metals and non-metals products; each group is allocated the full shipment price"
            );
        }

        Ok(ShipmentAllocation {
            shipment_id,
            client_id: shipment.client_id,
            report,
        })
    }
}
