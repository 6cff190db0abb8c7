//! Create note table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Note::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Note::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Note::AuthorId).string_len(36).not_null())
                    .col(ColumnDef::new(Note::Body).text().not_null())
                    .col(ColumnDef::new(Note::Visibility).string_len(16).not_null())
                    .col(ColumnDef::new(Note::InReplyToUri).string_len(1024))
                    .col(ColumnDef::new(Note::ObjectUri).string_len(1024).not_null())
                    .col(
                        ColumnDef::new(Note::ReplyCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Note::LikeCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Note::BoostCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Note::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Note::EditedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_note_author")
                            .from(Note::Table, Note::AuthorId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique: object_uri - canonical ActivityPub id
        manager
            .create_index(
                Index::create()
                    .name("idx_note_object_uri")
                    .table(Note::Table)
                    .col(Note::ObjectUri)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Index: in_reply_to_uri - thread assembly
        manager
            .create_index(
                Index::create()
                    .name("idx_note_in_reply_to_uri")
                    .table(Note::Table)
                    .col(Note::InReplyToUri)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Index: (author_id, created_at) - outbox pages
        manager
            .create_index(
                Index::create()
                    .name("idx_note_author_created_at")
                    .table(Note::Table)
                    .col(Note::AuthorId)
                    .col(Note::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Note::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Note {
    Table,
    Id,
    AuthorId,
    Body,
    Visibility,
    InReplyToUri,
    ObjectUri,
    ReplyCount,
    LikeCount,
    BoostCount,
    CreatedAt,
    EditedAt,
}

#[derive(Iden)]
enum Account {
    Table,
    Id,
}
