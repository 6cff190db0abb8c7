//! Add engagement counters to the activity cache.
//!
//! Databases created before engagement federation lack these columns;
//! newer ones already have them, so "duplicate column" is not an error.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

async fn add_column_if_missing(
    manager: &SchemaManager<'_>,
    column: Activity,
) -> Result<(), DbErr> {
    let result = manager
        .alter_table(
            Table::alter()
                .table(Activity::Table)
                .add_column(
                    ColumnDef::new(column)
                        .integer()
                        .not_null()
                        .default(0),
                )
                .to_owned(),
        )
        .await;

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.to_string().contains("duplicate column") => Ok(()),
        Err(e) => Err(e),
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        add_column_if_missing(manager, Activity::ReplyCount).await?;
        add_column_if_missing(manager, Activity::LikeCount).await?;
        add_column_if_missing(manager, Activity::BoostCount).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for column in [
            Activity::ReplyCount,
            Activity::LikeCount,
            Activity::BoostCount,
        ] {
            manager
                .alter_table(
                    Table::alter()
                        .table(Activity::Table)
                        .drop_column(column)
                        .to_owned(),
                )
                .await?;
        }
        Ok(())
    }
}

#[derive(Iden, Clone, Copy)]
enum Activity {
    Table,
    ReplyCount,
    LikeCount,
    BoostCount,
}
