//! Relay subscription repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use starling_common::{AppError, AppResult};

use super::map_db_err;
use crate::entities::{Relay, relay};

/// Repository for relay subscriptions.
#[derive(Clone)]
pub struct RelayRepository {
    db: Arc<DatabaseConnection>,
}

impl RelayRepository {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn create(&self, model: relay::ActiveModel) -> AppResult<relay::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<relay::Model>> {
        Relay::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<relay::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("relay {id}")))
    }

    pub async fn find_by_actor_uri(&self, actor_uri: &str) -> AppResult<Option<relay::Model>> {
        Relay::find()
            .filter(relay::Column::ActorUri.eq(actor_uri))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn list(&self) -> AppResult<Vec<relay::Model>> {
        Relay::find()
            .order_by_asc(relay::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Relays whose subscription handshake completed.
    pub async fn list_active(&self) -> AppResult<Vec<relay::Model>> {
        Relay::find()
            .filter(relay::Column::Status.eq(relay::RelayStatus::Active))
            .order_by_asc(relay::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn set_active(&self, id: &str, accepted_at: DateTime<Utc>) -> AppResult<()> {
        let relay = self.get_by_id(id).await?;
        let mut active: relay::ActiveModel = relay.into();
        active.status = Set(relay::RelayStatus::Active);
        active.accepted_at = Set(Some(accepted_at));
        active.update(self.db.as_ref()).await.map_err(map_db_err)?;
        Ok(())
    }

    pub async fn set_failed(&self, id: &str) -> AppResult<()> {
        let relay = self.get_by_id(id).await?;
        let mut active: relay::ActiveModel = relay.into();
        active.status = Set(relay::RelayStatus::Failed);
        active.update(self.db.as_ref()).await.map_err(map_db_err)?;
        Ok(())
    }

    pub async fn set_paused(&self, id: &str, paused: bool) -> AppResult<()> {
        let relay = self.get_by_id(id).await?;
        let mut active: relay::ActiveModel = relay.into();
        active.paused = Set(paused);
        active.update(self.db.as_ref()).await.map_err(map_db_err)?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Relay::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;
        Ok(())
    }
}
