//! Local account repository.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use starling_common::{AppError, AppResult};

use super::map_db_err;
use crate::entities::{Account, account};

/// Repository for local actors.
#[derive(Clone)]
pub struct AccountRepository {
    db: Arc<DatabaseConnection>,
}

impl AccountRepository {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a new local account. Username uniqueness is
    /// case-insensitive; a clash surfaces as `DuplicateKey`.
    pub async fn create(&self, model: account::ActiveModel) -> AppResult<account::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<account::Model>> {
        Account::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Find an account by username, case-insensitively.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<account::Model>> {
        Account::find()
            .filter(account::Column::UsernameLower.eq(username.to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Find an account by username, returning an error if absent.
    pub async fn get_by_username(&self, username: &str) -> AppResult<account::Model> {
        self.find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("account {username}")))
    }

    pub async fn count(&self) -> AppResult<u64> {
        Account::find()
            .count(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn list(&self) -> AppResult<Vec<account::Model>> {
        Account::find()
            .order_by_asc(account::Column::UsernameLower)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    pub async fn set_muted(&self, id: &str, muted: bool) -> AppResult<()> {
        let account = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("account {id}")))?;
        let mut active: account::ActiveModel = account.into();
        active.muted = Set(muted);
        active.update(self.db.as_ref()).await.map_err(map_db_err)?;
        Ok(())
    }

    pub async fn update_profile(
        &self,
        id: &str,
        display_name: Option<String>,
        summary: Option<String>,
    ) -> AppResult<account::Model> {
        let account = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("account {id}")))?;
        let mut active: account::ActiveModel = account.into();
        active.display_name = Set(display_name);
        active.summary = Set(summary);
        active.update(self.db.as_ref()).await.map_err(map_db_err)
    }
}
