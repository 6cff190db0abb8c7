//! Remote actor cache repository.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter,
};
use starling_common::AppResult;

use super::{map_db_err, with_retry};
use crate::entities::{Follow, RemoteActor, follow, remote_actor};

/// Repository for cached remote actors.
#[derive(Clone)]
pub struct RemoteActorRepository {
    db: Arc<DatabaseConnection>,
}

impl RemoteActorRepository {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<remote_actor::Model>> {
        RemoteActor::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn find_by_uri(&self, actor_uri: &str) -> AppResult<Option<remote_actor::Model>> {
        RemoteActor::find()
            .filter(remote_actor::Column::ActorUri.eq(actor_uri))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn find_by_username_domain(
        &self,
        username: &str,
        domain: &str,
    ) -> AppResult<Option<remote_actor::Model>> {
        RemoteActor::find()
            .filter(remote_actor::Column::Username.eq(username))
            .filter(remote_actor::Column::Domain.eq(domain))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<remote_actor::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        RemoteActor::find()
            .filter(remote_actor::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn create(&self, model: remote_actor::ActiveModel) -> AppResult<remote_actor::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Refresh an existing row. The internal id never changes on refresh
    /// so foreign references stay valid.
    pub async fn update(&self, model: remote_actor::ActiveModel) -> AppResult<remote_actor::Model> {
        model.update(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Delete a remote actor together with every follow edge it is part
    /// of, in one transaction.
    pub async fn delete_cascade(&self, id: &str) -> AppResult<()> {
        let Some(actor) = self.find_by_id(id).await? else {
            return Ok(());
        };
        let actor_id = actor.id.clone();
        with_retry(self.db.as_ref(), move |txn| {
            let actor = actor.clone();
            let actor_id = actor_id.clone();
            Box::pin(async move {
                Follow::delete_many()
                    .filter(
                        Condition::any()
                            .add(follow::Column::FollowerId.eq(actor_id.clone()))
                            .add(follow::Column::TargetId.eq(actor_id)),
                    )
                    .exec(txn)
                    .await
                    .map_err(map_db_err)?;
                actor.delete(txn).await.map_err(map_db_err)?;
                Ok(())
            })
        })
        .await
    }
}
