//! Create boost table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Boost::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Boost::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Boost::AccountId).string_len(36).not_null())
                    .col(ColumnDef::new(Boost::NoteId).string_len(36))
                    .col(ColumnDef::new(Boost::ObjectUri).string_len(1024))
                    .col(ColumnDef::new(Boost::Uri).string_len(1024).not_null())
                    .col(ColumnDef::new(Boost::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Unique: (account_id, note_id) - one boost per local note
        manager
            .create_index(
                Index::create()
                    .name("idx_boost_account_note")
                    .table(Boost::Table)
                    .col(Boost::AccountId)
                    .col(Boost::NoteId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Unique: (account_id, object_uri) - one boost per federated object
        manager
            .create_index(
                Index::create()
                    .name("idx_boost_account_object")
                    .table(Boost::Table)
                    .col(Boost::AccountId)
                    .col(Boost::ObjectUri)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Index: uri - Undo lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_boost_uri")
                    .table(Boost::Table)
                    .col(Boost::Uri)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Boost::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Boost {
    Table,
    Id,
    AccountId,
    NoteId,
    ObjectUri,
    Uri,
    CreatedAt,
}
