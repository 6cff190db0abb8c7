//! Create follow table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Follow::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Follow::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Follow::FollowerId).string_len(36).not_null())
                    .col(ColumnDef::new(Follow::TargetId).string_len(36).not_null())
                    .col(ColumnDef::new(Follow::Uri).string_len(1024).not_null())
                    .col(
                        ColumnDef::new(Follow::Accepted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Follow::IsLocal)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Follow::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Unique: (follower_id, target_id) - dedupe follows
        manager
            .create_index(
                Index::create()
                    .name("idx_follow_follower_target")
                    .table(Follow::Table)
                    .col(Follow::FollowerId)
                    .col(Follow::TargetId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Index: target_id - follower listings
        manager
            .create_index(
                Index::create()
                    .name("idx_follow_target")
                    .table(Follow::Table)
                    .col(Follow::TargetId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Index: uri - Accept/Undo lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_follow_uri")
                    .table(Follow::Table)
                    .col(Follow::Uri)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Follow::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Follow {
    Table,
    Id,
    FollowerId,
    TargetId,
    Uri,
    Accepted,
    IsLocal,
    CreatedAt,
}
