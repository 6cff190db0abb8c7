//! Create remote actor cache table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RemoteActor::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RemoteActor::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RemoteActor::Username)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RemoteActor::Domain)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RemoteActor::ActorUri)
                            .string_len(1024)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RemoteActor::InboxUri)
                            .string_len(1024)
                            .not_null(),
                    )
                    .col(ColumnDef::new(RemoteActor::SharedInboxUri).string_len(1024))
                    .col(ColumnDef::new(RemoteActor::PublicKeyPem).text().not_null())
                    .col(ColumnDef::new(RemoteActor::DisplayName).string_len(256))
                    .col(ColumnDef::new(RemoteActor::Summary).text())
                    .col(ColumnDef::new(RemoteActor::AvatarUrl).string_len(1024))
                    .col(
                        ColumnDef::new(RemoteActor::LastFetchedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique: actor_uri - canonical identity
        manager
            .create_index(
                Index::create()
                    .name("idx_remote_actor_uri")
                    .table(RemoteActor::Table)
                    .col(RemoteActor::ActorUri)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Unique: (username, domain) - handle identity
        manager
            .create_index(
                Index::create()
                    .name("idx_remote_actor_username_domain")
                    .table(RemoteActor::Table)
                    .col(RemoteActor::Username)
                    .col(RemoteActor::Domain)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RemoteActor::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum RemoteActor {
    Table,
    Id,
    Username,
    Domain,
    ActorUri,
    InboxUri,
    SharedInboxUri,
    PublicKeyPem,
    DisplayName,
    Summary,
    AvatarUrl,
    LastFetchedAt,
}
