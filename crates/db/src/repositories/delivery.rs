//! Delivery queue repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use starling_common::{AppError, AppResult};

use super::map_db_err;
use crate::entities::{DeliveryItem, delivery_item};

/// Repository for the durable delivery queue.
#[derive(Clone)]
pub struct DeliveryRepository {
    db: Arc<DatabaseConnection>,
}

impl DeliveryRepository {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn enqueue(&self, model: delivery_item::ActiveModel) -> AppResult<delivery_item::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    pub async fn enqueue_many(&self, models: Vec<delivery_item::ActiveModel>) -> AppResult<()> {
        if models.is_empty() {
            return Ok(());
        }
        DeliveryItem::insert_many(models)
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    /// Items due at `now`, oldest deadline first. The single delivery
    /// worker claims these; per-item serialization follows from there
    /// being exactly one worker.
    pub async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<delivery_item::Model>> {
        DeliveryItem::find()
            .filter(delivery_item::Column::NextRetryAt.lte(now))
            .order_by_asc(delivery_item::Column::NextRetryAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<delivery_item::Model>> {
        DeliveryItem::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        DeliveryItem::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    /// Record a failed attempt and push the deadline out.
    pub async fn reschedule(
        &self,
        id: &str,
        attempts: i32,
        next_retry_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let item = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("delivery item {id}")))?;
        let mut active: delivery_item::ActiveModel = item.into();
        active.attempts = Set(attempts);
        active.next_retry_at = Set(next_retry_at);
        active.update(self.db.as_ref()).await.map_err(map_db_err)?;
        Ok(())
    }

    pub async fn count(&self) -> AppResult<u64> {
        DeliveryItem::find()
            .count(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn list_all(&self) -> AppResult<Vec<delivery_item::Model>> {
        DeliveryItem::find()
            .order_by_asc(delivery_item::Column::NextRetryAt)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }
}
