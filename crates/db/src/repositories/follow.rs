//! Follow edge repository.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use starling_common::AppResult;

use super::map_db_err;
use crate::entities::{Follow, follow};

/// Repository for follow edges in both directions.
#[derive(Clone)]
pub struct FollowRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowRepository {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a follow edge. `(follower_id, target_id)` is unique; a
    /// duplicate surfaces as `DuplicateKey`.
    pub async fn create(&self, model: follow::ActiveModel) -> AppResult<follow::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    pub async fn find_by_pair(
        &self,
        follower_id: &str,
        target_id: &str,
    ) -> AppResult<Option<follow::Model>> {
        Follow::find()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::TargetId.eq(target_id))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn exists(&self, follower_id: &str, target_id: &str) -> AppResult<bool> {
        Ok(self.find_by_pair(follower_id, target_id).await?.is_some())
    }

    pub async fn find_by_uri(&self, uri: &str) -> AppResult<Option<follow::Model>> {
        Follow::find()
            .filter(follow::Column::Uri.eq(uri))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Mark an outgoing follow accepted by the URI of the original Follow
    /// activity. Returns whether a pending edge was transitioned; a
    /// duplicate Accept is a no-op.
    pub async fn accept_by_uri(&self, uri: &str) -> AppResult<bool> {
        let Some(existing) = self.find_by_uri(uri).await? else {
            return Ok(false);
        };
        if existing.accepted {
            return Ok(false);
        }
        let mut active: follow::ActiveModel = existing.into();
        active.accepted = Set(true);
        active.update(self.db.as_ref()).await.map_err(map_db_err)?;
        Ok(true)
    }

    pub async fn delete_by_pair(&self, follower_id: &str, target_id: &str) -> AppResult<()> {
        Follow::delete_many()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::TargetId.eq(target_id))
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    pub async fn delete_by_uri(&self, uri: &str) -> AppResult<()> {
        Follow::delete_many()
            .filter(follow::Column::Uri.eq(uri))
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    /// Remove every edge an actor participates in (either side).
    pub async fn delete_all_for_actor(&self, actor_id: &str) -> AppResult<u64> {
        let result = Follow::delete_many()
            .filter(
                Condition::any()
                    .add(follow::Column::FollowerId.eq(actor_id))
                    .add(follow::Column::TargetId.eq(actor_id)),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected)
    }

    /// Accepted followers of a target, newest first.
    pub async fn followers_of(&self, target_id: &str) -> AppResult<Vec<follow::Model>> {
        Follow::find()
            .filter(follow::Column::TargetId.eq(target_id))
            .filter(follow::Column::Accepted.eq(true))
            .order_by_desc(follow::Column::CreatedAt)
            .order_by_desc(follow::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Accepted follows originated by a follower, newest first.
    pub async fn following_of(&self, follower_id: &str) -> AppResult<Vec<follow::Model>> {
        Follow::find()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::Accepted.eq(true))
            .order_by_desc(follow::Column::CreatedAt)
            .order_by_desc(follow::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn count_followers(&self, target_id: &str) -> AppResult<u64> {
        Follow::find()
            .filter(follow::Column::TargetId.eq(target_id))
            .filter(follow::Column::Accepted.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn count_following(&self, follower_id: &str) -> AppResult<u64> {
        Follow::find()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::Accepted.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Whether any local account follows the given remote actor. Gates
    /// acceptance of plain incoming Create activities.
    pub async fn local_follower_exists(&self, remote_actor_id: &str) -> AppResult<bool> {
        let count = Follow::find()
            .filter(follow::Column::TargetId.eq(remote_actor_id))
            .filter(follow::Column::IsLocal.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(map_db_err)?;
        Ok(count > 0)
    }
}
