//! Create like table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Like::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Like::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Like::AccountId).string_len(36).not_null())
                    .col(ColumnDef::new(Like::NoteId).string_len(36))
                    .col(ColumnDef::new(Like::ObjectUri).string_len(1024))
                    .col(ColumnDef::new(Like::Uri).string_len(1024).not_null())
                    .col(ColumnDef::new(Like::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Unique: (account_id, note_id) - one like per local note
        manager
            .create_index(
                Index::create()
                    .name("idx_like_account_note")
                    .table(Like::Table)
                    .col(Like::AccountId)
                    .col(Like::NoteId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Unique: (account_id, object_uri) - one like per federated object
        manager
            .create_index(
                Index::create()
                    .name("idx_like_account_object")
                    .table(Like::Table)
                    .col(Like::AccountId)
                    .col(Like::ObjectUri)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Index: uri - Undo lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_like_uri")
                    .table(Like::Table)
                    .col(Like::Uri)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Like::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Like {
    Table,
    Id,
    AccountId,
    NoteId,
    ObjectUri,
    Uri,
    CreatedAt,
}
