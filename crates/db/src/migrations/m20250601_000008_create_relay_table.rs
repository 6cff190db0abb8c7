//! Create relay table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Relay::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Relay::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Relay::ActorUri).string_len(1024).not_null())
                    .col(ColumnDef::new(Relay::InboxUri).string_len(1024).not_null())
                    .col(ColumnDef::new(Relay::FollowUri).string_len(1024).not_null())
                    .col(ColumnDef::new(Relay::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Relay::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Relay::Paused)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Relay::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Relay::AcceptedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        // Unique: actor_uri
        manager
            .create_index(
                Index::create()
                    .name("idx_relay_actor_uri")
                    .table(Relay::Table)
                    .col(Relay::ActorUri)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Relay::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Relay {
    Table,
    Id,
    ActorUri,
    InboxUri,
    FollowUri,
    Name,
    Status,
    Paused,
    CreatedAt,
    AcceptedAt,
}
