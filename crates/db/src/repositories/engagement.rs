//! Likes, boosts and their denormalized counters.
//!
//! Counters on notes and cached activities are only ever touched here,
//! fused with the insert or delete of the underlying row in a single
//! transaction, so the counter always equals the count of surviving rows.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, sea_query::Expr,
};
use starling_common::{AppError, AppResult, IdGenerator};
use tracing::debug;

use super::{map_db_err, with_retry};
use crate::entities::{Activity, Boost, Like, Note, activity, boost, like, note};

/// What an engagement row points at.
#[derive(Debug, Clone)]
pub enum EngagementTarget {
    /// A local note, by id.
    Note(String),
    /// Federated content, by object URI.
    Object(String),
}

/// Which counter a mutation applies to.
#[derive(Debug, Clone, Copy)]
enum Counter {
    Reply,
    Like,
    Boost,
}

/// Repository fusing like/boost rows with counter updates.
#[derive(Clone)]
pub struct EngagementRepository {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl EngagementRepository {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    // === Likes ===

    /// Record a like and increment the target's counter. Returns false
    /// when the `(account, target)` pair already liked — a replayed
    /// activity — in which case nothing changes.
    pub async fn add_like(
        &self,
        account_id: &str,
        target: &EngagementTarget,
        uri: &str,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<bool> {
        let id = self.id_gen.generate();
        let account_id = account_id.to_string();
        let target = target.clone();
        let uri = uri.to_string();

        let result = with_retry(self.db.as_ref(), move |txn| {
            let (id, account_id, target, uri) =
                (id.clone(), account_id.clone(), target.clone(), uri.clone());
            Box::pin(async move {
                if find_like_in_txn(txn, &account_id, &target).await?.is_some() {
                    return Ok(false);
                }
                let (note_id, object_uri) = target_columns(&target);
                like::ActiveModel {
                    id: Set(id),
                    account_id: Set(account_id),
                    note_id: Set(note_id),
                    object_uri: Set(object_uri),
                    uri: Set(uri),
                    created_at: Set(created_at),
                }
                .insert(txn)
                .await
                .map_err(map_db_err)?;
                bump_counter(txn, &target, Counter::Like, 1).await?;
                Ok(true)
            })
        })
        .await;

        match result {
            // The unique index backstops check-then-insert races.
            Err(AppError::DuplicateKey(_)) => Ok(false),
            other => other,
        }
    }

    pub async fn find_like_by_uri(&self, uri: &str) -> AppResult<Option<like::Model>> {
        Like::find()
            .filter(like::Column::Uri.eq(uri))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn find_like(
        &self,
        account_id: &str,
        target: &EngagementTarget,
    ) -> AppResult<Option<like::Model>> {
        let mut query = Like::find().filter(like::Column::AccountId.eq(account_id));
        query = match target {
            EngagementTarget::Note(note_id) => query.filter(like::Column::NoteId.eq(note_id)),
            EngagementTarget::Object(uri) => query.filter(like::Column::ObjectUri.eq(uri)),
        };
        query.one(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Delete a like row and decrement the matching counter.
    pub async fn remove_like(&self, row: like::Model) -> AppResult<()> {
        let target = row_target(row.note_id.as_deref(), row.object_uri.as_deref());
        let row_id = row.id.clone();
        with_retry(self.db.as_ref(), move |txn| {
            let (row_id, target) = (row_id.clone(), target.clone());
            Box::pin(async move {
                let deleted = Like::delete_by_id(row_id)
                    .exec(txn)
                    .await
                    .map_err(map_db_err)?;
                if deleted.rows_affected > 0 {
                    bump_counter(txn, &target, Counter::Like, -1).await?;
                }
                Ok(())
            })
        })
        .await
    }

    // === Boosts ===

    /// Record a boost and increment the target's counter. Returns false
    /// on a replay, in which case nothing changes.
    pub async fn add_boost(
        &self,
        account_id: &str,
        target: &EngagementTarget,
        uri: &str,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<bool> {
        let id = self.id_gen.generate();
        let account_id = account_id.to_string();
        let target = target.clone();
        let uri = uri.to_string();

        let result = with_retry(self.db.as_ref(), move |txn| {
            let (id, account_id, target, uri) =
                (id.clone(), account_id.clone(), target.clone(), uri.clone());
            Box::pin(async move {
                if find_boost_in_txn(txn, &account_id, &target).await?.is_some() {
                    return Ok(false);
                }
                let (note_id, object_uri) = target_columns(&target);
                boost::ActiveModel {
                    id: Set(id),
                    account_id: Set(account_id),
                    note_id: Set(note_id),
                    object_uri: Set(object_uri),
                    uri: Set(uri),
                    created_at: Set(created_at),
                }
                .insert(txn)
                .await
                .map_err(map_db_err)?;
                bump_counter(txn, &target, Counter::Boost, 1).await?;
                Ok(true)
            })
        })
        .await;

        match result {
            Err(AppError::DuplicateKey(_)) => Ok(false),
            other => other,
        }
    }

    pub async fn find_boost_by_uri(&self, uri: &str) -> AppResult<Option<boost::Model>> {
        Boost::find()
            .filter(boost::Column::Uri.eq(uri))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn find_boost(
        &self,
        account_id: &str,
        target: &EngagementTarget,
    ) -> AppResult<Option<boost::Model>> {
        let mut query = Boost::find().filter(boost::Column::AccountId.eq(account_id));
        query = match target {
            EngagementTarget::Note(note_id) => query.filter(boost::Column::NoteId.eq(note_id)),
            EngagementTarget::Object(uri) => query.filter(boost::Column::ObjectUri.eq(uri)),
        };
        query.one(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Delete a boost row and decrement the matching counter.
    pub async fn remove_boost(&self, row: boost::Model) -> AppResult<()> {
        let target = row_target(row.note_id.as_deref(), row.object_uri.as_deref());
        let row_id = row.id.clone();
        with_retry(self.db.as_ref(), move |txn| {
            let (row_id, target) = (row_id.clone(), target.clone());
            Box::pin(async move {
                let deleted = Boost::delete_by_id(row_id)
                    .exec(txn)
                    .await
                    .map_err(map_db_err)?;
                if deleted.rows_affected > 0 {
                    bump_counter(txn, &target, Counter::Boost, -1).await?;
                }
                Ok(())
            })
        })
        .await
    }

    // === Reply counters ===

    /// Increment the reply counter of the note or cached activity the URI
    /// points at. Returns false when no target exists (e.g. the parent was
    /// deleted locally), in which case nothing is counted.
    pub async fn increment_reply_count(&self, object_uri: &str) -> AppResult<bool> {
        let target = EngagementTarget::Object(object_uri.to_string());
        with_retry(self.db.as_ref(), move |txn| {
            let target = target.clone();
            Box::pin(async move { bump_counter(txn, &target, Counter::Reply, 1).await })
        })
        .await
    }

    pub async fn decrement_reply_count(&self, object_uri: &str) -> AppResult<bool> {
        let target = EngagementTarget::Object(object_uri.to_string());
        with_retry(self.db.as_ref(), move |txn| {
            let target = target.clone();
            Box::pin(async move { bump_counter(txn, &target, Counter::Reply, -1).await })
        })
        .await
    }
}

fn target_columns(target: &EngagementTarget) -> (Option<String>, Option<String>) {
    match target {
        EngagementTarget::Note(id) => (Some(id.clone()), None),
        EngagementTarget::Object(uri) => (None, Some(uri.clone())),
    }
}

fn row_target(note_id: Option<&str>, object_uri: Option<&str>) -> EngagementTarget {
    match (note_id, object_uri) {
        (Some(id), _) => EngagementTarget::Note(id.to_string()),
        (None, Some(uri)) => EngagementTarget::Object(uri.to_string()),
        (None, None) => EngagementTarget::Object(String::new()),
    }
}

async fn find_like_in_txn(
    txn: &DatabaseTransaction,
    account_id: &str,
    target: &EngagementTarget,
) -> AppResult<Option<like::Model>> {
    let mut query = Like::find().filter(like::Column::AccountId.eq(account_id));
    query = match target {
        EngagementTarget::Note(note_id) => query.filter(like::Column::NoteId.eq(note_id)),
        EngagementTarget::Object(uri) => query.filter(like::Column::ObjectUri.eq(uri)),
    };
    query.one(txn).await.map_err(map_db_err)
}

async fn find_boost_in_txn(
    txn: &DatabaseTransaction,
    account_id: &str,
    target: &EngagementTarget,
) -> AppResult<Option<boost::Model>> {
    let mut query = Boost::find().filter(boost::Column::AccountId.eq(account_id));
    query = match target {
        EngagementTarget::Note(note_id) => query.filter(boost::Column::NoteId.eq(note_id)),
        EngagementTarget::Object(uri) => query.filter(boost::Column::ObjectUri.eq(uri)),
    };
    query.one(txn).await.map_err(map_db_err)
}

/// Apply a counter delta to the target's note row, falling back to the
/// cached activity when the URI does not belong to a local note. Returns
/// whether any row was updated.
async fn bump_counter(
    txn: &DatabaseTransaction,
    target: &EngagementTarget,
    counter: Counter,
    delta: i32,
) -> AppResult<bool> {
    match target {
        EngagementTarget::Note(note_id) => {
            let column = match counter {
                Counter::Reply => note::Column::ReplyCount,
                Counter::Like => note::Column::LikeCount,
                Counter::Boost => note::Column::BoostCount,
            };
            let updated = Note::update_many()
                .col_expr(column, Expr::col(column).add(delta))
                .filter(note::Column::Id.eq(note_id))
                .exec(txn)
                .await
                .map_err(map_db_err)?;
            Ok(updated.rows_affected > 0)
        }
        EngagementTarget::Object(object_uri) => {
            let column = match counter {
                Counter::Reply => note::Column::ReplyCount,
                Counter::Like => note::Column::LikeCount,
                Counter::Boost => note::Column::BoostCount,
            };
            let updated = Note::update_many()
                .col_expr(column, Expr::col(column).add(delta))
                .filter(note::Column::ObjectUri.eq(object_uri))
                .exec(txn)
                .await
                .map_err(map_db_err)?;
            if updated.rows_affected > 0 {
                return Ok(true);
            }

            let column = match counter {
                Counter::Reply => activity::Column::ReplyCount,
                Counter::Like => activity::Column::LikeCount,
                Counter::Boost => activity::Column::BoostCount,
            };
            let updated = Activity::update_many()
                .col_expr(column, Expr::col(column).add(delta))
                .filter(activity::Column::ObjectUri.eq(object_uri))
                .filter(activity::Column::ActivityType.eq("Create"))
                .exec(txn)
                .await
                .map_err(map_db_err)?;
            if updated.rows_affected == 0 {
                debug!(object_uri, "Counter target not found; skipping update");
                return Ok(false);
            }
            Ok(true)
        }
    }
}
