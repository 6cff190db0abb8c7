//! Create delivery queue table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeliveryItem::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeliveryItem::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DeliveryItem::InboxUri)
                            .string_len(1024)
                            .not_null(),
                    )
                    .col(ColumnDef::new(DeliveryItem::ActivityJson).json().not_null())
                    .col(
                        ColumnDef::new(DeliveryItem::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DeliveryItem::NextRetryAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryItem::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: next_retry_at - worker dequeue
        manager
            .create_index(
                Index::create()
                    .name("idx_delivery_item_next_retry_at")
                    .table(DeliveryItem::Table)
                    .col(DeliveryItem::NextRetryAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeliveryItem::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum DeliveryItem {
    Table,
    Id,
    InboxUri,
    ActivityJson,
    Attempts,
    NextRetryAt,
    CreatedAt,
}
