//! Received-activity cache repository.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    QueryFilter,
};
use serde_json::Value;
use starling_common::{AppError, AppResult};

use super::map_db_err;
use crate::entities::{Activity, activity};

/// Repository for the federated activity cache.
#[derive(Clone)]
pub struct ActivityRepository {
    db: Arc<DatabaseConnection>,
}

impl ActivityRepository {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a received activity. A second delivery of the same
    /// `activity_uri` surfaces as `DuplicateKey`; the inbox treats that
    /// as an idempotent replay.
    pub async fn insert(&self, model: activity::ActiveModel) -> AppResult<activity::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<activity::Model>> {
        Activity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn find_by_uri(&self, activity_uri: &str) -> AppResult<Option<activity::Model>> {
        Activity::find()
            .filter(activity::Column::ActivityUri.eq(activity_uri))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Find the cached `Create` for an object, used for engagement and
    /// edit lookups.
    pub async fn find_create_by_object_uri(
        &self,
        object_uri: &str,
    ) -> AppResult<Option<activity::Model>> {
        Activity::find()
            .filter(activity::Column::ObjectUri.eq(object_uri))
            .filter(activity::Column::ActivityType.eq("Create"))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Mark a row processed. A no-op when the row is gone; dispatch may
    /// legitimately have dropped it (e.g. content from an unfollowed
    /// actor).
    pub async fn mark_processed(&self, id: &str) -> AppResult<()> {
        let Some(activity) = self.find_by_id(id).await? else {
            return Ok(());
        };
        let mut active: activity::ActiveModel = activity.into();
        active.processed = Set(true);
        active.update(self.db.as_ref()).await.map_err(map_db_err)?;
        Ok(())
    }

    /// Replace the stored payload of an edited object.
    pub async fn replace_raw_json(&self, id: &str, raw_json: Value) -> AppResult<()> {
        let activity = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("activity {id}")))?;
        let mut active: activity::ActiveModel = activity.into();
        active.raw_json = Set(raw_json);
        active.update(self.db.as_ref()).await.map_err(map_db_err)?;
        Ok(())
    }

    /// Rewrite a row into the `Create` of the object it carries. Used when
    /// a relay-forwarded Announce is stored as content, and when an Update
    /// arrives for an object we never saw the Create of.
    pub async fn convert_to_create(
        &self,
        id: &str,
        object_uri: String,
        raw_json: Value,
        from_relay: bool,
    ) -> AppResult<activity::Model> {
        let activity = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("activity {id}")))?;
        let mut active: activity::ActiveModel = activity.into();
        active.activity_type = Set("Create".to_string());
        active.object_uri = Set(Some(object_uri));
        active.raw_json = Set(raw_json);
        active.from_relay = Set(from_relay);
        active.update(self.db.as_ref()).await.map_err(map_db_err)
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Activity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    /// Delete relay-forwarded content from one relay, matched by exact
    /// actor URI or by the relay's host (per-tag sub-actors share it).
    pub async fn purge_relay_content(&self, actor_uri: &str, domain: &str) -> AppResult<u64> {
        let result = Activity::delete_many()
            .filter(activity::Column::FromRelay.eq(true))
            .filter(
                Condition::any()
                    .add(activity::Column::ActorUri.eq(actor_uri))
                    .add(activity::Column::ActorUri.like(format!("https://{domain}/%"))),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected)
    }
}
