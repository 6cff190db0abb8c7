//! Backfill `username_lower` for accounts created before the column
//! existed. Skips entirely when no row is left to fill.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, Statement};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let backend = manager.get_database_backend();

        let pending = db
            .query_one(Statement::from_string(
                backend,
                "SELECT COUNT(*) AS cnt FROM account WHERE username_lower = ''".to_string(),
            ))
            .await?
            .map(|row| row.try_get::<i64>("", "cnt"))
            .transpose()?
            .unwrap_or(0);

        if pending == 0 {
            return Ok(());
        }

        db.execute(Statement::from_string(
            backend,
            "UPDATE account SET username_lower = LOWER(username) WHERE username_lower = ''"
                .to_string(),
        ))
        .await?;

        Ok(())
    }

    async fn down(&self, _manager: &SchemaManager) -> Result<(), DbErr> {
        // Data backfill; nothing to revert.
        Ok(())
    }
}
