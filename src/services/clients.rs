use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{delete_client_cascade, find_client};
use crate::db::{with_transaction, DbPool};
use crate::errors::ServiceError;
use crate::models::client;

#[derive(Clone)]
pub struct ClientService {
    db_pool: Arc<DbPool>,
}

impl ClientService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Newest client registered under `mark`, used to prefill forms.
    ///
    /// Marks are not unique, since every import row creates a client. The
    /// most recently created one is returned rather than the first ever
    /// registered, so a prefilled form carries the latest name and phone.
    #[instrument(skip(self))]
    pub async fn find_by_mark(&self, mark: &str) -> Result<client::Model, ServiceError> {
        let mark = mark.trim();
        client::Entity::find()
            .filter(client::Column::Mark.eq(mark))
            .order_by_desc(client::Column::CreatedAt)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("No client with mark {mark}")))
    }

    /// Deletes a client with all of its shipments and products.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let client = find_client(txn, id).await?;
                delete_client_cascade(txn, client).await
            })
        })
        .await?;
        info!(client_id = %id, "Client deleted");
        Ok(())
    }
}
