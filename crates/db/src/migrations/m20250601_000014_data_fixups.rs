//! Data fix-ups.
//!
//! 1. Update activities whose original Create never arrived are converted
//!    to Create so the cached object is reachable.
//! 2. Usernames that collide case-insensitively are disambiguated with a
//!    numeric suffix, then the case-insensitive unique index is created.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, Statement, Value};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let backend = manager.get_database_backend();

        // Orphaned Update -> Create conversion.
        db.execute(Statement::from_string(
            backend,
            "UPDATE activity SET activity_type = 'Create' \
             WHERE activity_type = 'Update' \
               AND object_uri IS NOT NULL \
               AND object_uri NOT IN ( \
                   SELECT object_uri FROM activity \
                   WHERE activity_type = 'Create' AND object_uri IS NOT NULL)"
                .to_string(),
        ))
        .await?;

        // Disambiguate usernames that collide case-insensitively, keeping
        // the oldest account untouched.
        let rows = db
            .query_all(Statement::from_string(
                backend,
                "SELECT id, username FROM account ORDER BY created_at ASC, id ASC".to_string(),
            ))
            .await?;

        let mut seen: Vec<String> = Vec::new();
        for row in rows {
            let id: String = row.try_get("", "id")?;
            let username: String = row.try_get("", "username")?;
            let mut candidate = username.clone();
            let mut suffix = 1;
            while seen.contains(&candidate.to_lowercase()) {
                suffix += 1;
                candidate = format!("{username}-{suffix}");
            }
            if candidate != username {
                db.execute(Statement::from_sql_and_values(
                    backend,
                    "UPDATE account SET username = ?, username_lower = ? WHERE id = ?",
                    [
                        Value::from(candidate.clone()),
                        Value::from(candidate.to_lowercase()),
                        Value::from(id),
                    ],
                ))
                .await?;
            }
            seen.push(candidate.to_lowercase());
        }

        manager
            .create_index(
                Index::create()
                    .name("idx_account_username_lower")
                    .table(Account::Table)
                    .col(Account::UsernameLower)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_account_username_lower")
                    .table(Account::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
enum Account {
    Table,
    UsernameLower,
}
