//! Note repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use starling_common::{AppError, AppResult};

use super::map_db_err;
use crate::entities::{Note, note};

/// Note repository for database operations.
#[derive(Clone)]
pub struct NoteRepository {
    db: Arc<DatabaseConnection>,
}

impl NoteRepository {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn create(&self, model: note::ActiveModel) -> AppResult<note::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<note::Model>> {
        Note::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<note::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("note {id}")))
    }

    /// Find a note by its canonical ActivityPub id.
    pub async fn find_by_uri(&self, object_uri: &str) -> AppResult<Option<note::Model>> {
        Note::find()
            .filter(note::Column::ObjectUri.eq(object_uri))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Public notes of one author, newest first, for outbox pages.
    pub async fn find_public_by_author(
        &self,
        author_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<note::Model>> {
        Note::find()
            .filter(note::Column::AuthorId.eq(author_id))
            .filter(note::Column::Visibility.eq(note::Visibility::Public))
            .order_by_desc(note::Column::CreatedAt)
            .order_by_desc(note::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn count_public_by_author(&self, author_id: &str) -> AppResult<u64> {
        Note::find()
            .filter(note::Column::AuthorId.eq(author_id))
            .filter(note::Column::Visibility.eq(note::Visibility::Public))
            .count(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Replies to a note, used for thread assembly.
    pub async fn find_replies(&self, object_uri: &str) -> AppResult<Vec<note::Model>> {
        Note::find()
            .filter(note::Column::InReplyToUri.eq(object_uri))
            .order_by_asc(note::Column::CreatedAt)
            .order_by_asc(note::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Apply an edit, stamping `edited_at`.
    pub async fn update_body(
        &self,
        id: &str,
        body: String,
        edited_at: DateTime<Utc>,
    ) -> AppResult<note::Model> {
        let note = self.get_by_id(id).await?;
        let mut active: note::ActiveModel = note.into();
        active.body = Set(body);
        active.edited_at = Set(Some(edited_at));
        active.update(self.db.as_ref()).await.map_err(map_db_err)
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Note::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;
        Ok(())
    }
}
