//! Database migrations.
//!
//! Run once per process start; table and index creation is
//! create-if-absent, column additions tolerate already-present columns,
//! and backfills check for remaining work before running.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250601_000001_create_account_table;
mod m20250601_000002_create_remote_actor_table;
mod m20250601_000003_create_note_table;
mod m20250601_000004_create_activity_table;
mod m20250601_000005_create_follow_table;
mod m20250601_000006_create_like_table;
mod m20250601_000007_create_boost_table;
mod m20250601_000008_create_relay_table;
mod m20250601_000009_create_delivery_queue_table;
mod m20250601_000010_create_notification_table;
mod m20250601_000011_add_activity_counters;
mod m20250601_000012_add_account_username_lower;
mod m20250601_000013_backfill_username_lower;
mod m20250601_000014_data_fixups;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_account_table::Migration),
            Box::new(m20250601_000002_create_remote_actor_table::Migration),
            Box::new(m20250601_000003_create_note_table::Migration),
            Box::new(m20250601_000004_create_activity_table::Migration),
            Box::new(m20250601_000005_create_follow_table::Migration),
            Box::new(m20250601_000006_create_like_table::Migration),
            Box::new(m20250601_000007_create_boost_table::Migration),
            Box::new(m20250601_000008_create_relay_table::Migration),
            Box::new(m20250601_000009_create_delivery_queue_table::Migration),
            Box::new(m20250601_000010_create_notification_table::Migration),
            Box::new(m20250601_000011_add_activity_counters::Migration),
            Box::new(m20250601_000012_add_account_username_lower::Migration),
            Box::new(m20250601_000013_backfill_username_lower::Migration),
            Box::new(m20250601_000014_data_fixups::Migration),
        ]
    }
}
