//! Create activity cache table migration.
//!
//! Engagement counters were added later; see the add-column migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Activity::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Activity::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Activity::ActivityUri)
                            .string_len(1024)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Activity::ActivityType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Activity::ActorUri)
                            .string_len(1024)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Activity::ObjectUri).string_len(1024))
                    .col(ColumnDef::new(Activity::RawJson).json().not_null())
                    .col(ColumnDef::new(Activity::ReceivedAt).timestamp().not_null())
                    .col(
                        ColumnDef::new(Activity::Processed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Activity::FromRelay)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique: activity_uri - deduplication of replayed deliveries
        manager
            .create_index(
                Index::create()
                    .name("idx_activity_uri")
                    .table(Activity::Table)
                    .col(Activity::ActivityUri)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Index: object_uri - reply/engagement lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_activity_object_uri")
                    .table(Activity::Table)
                    .col(Activity::ObjectUri)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Index: from_relay - relay-content purge
        manager
            .create_index(
                Index::create()
                    .name("idx_activity_from_relay")
                    .table(Activity::Table)
                    .col(Activity::FromRelay)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Activity::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Activity {
    Table,
    Id,
    ActivityUri,
    ActivityType,
    ActorUri,
    ObjectUri,
    RawJson,
    ReceivedAt,
    Processed,
    FromRelay,
}
