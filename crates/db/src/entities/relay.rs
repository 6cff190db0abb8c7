//! Relay subscription entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Relay subscription lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum RelayStatus {
    /// Follow sent, no Accept yet.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Accept received; content flows.
    #[sea_orm(string_value = "active")]
    Active,
    /// Subscription attempt failed.
    #[sea_orm(string_value = "failed")]
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "relay")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub actor_uri: String,

    pub inbox_uri: String,

    /// URI of our outgoing Follow, referenced by the Undo on unsubscribe.
    pub follow_uri: String,

    pub name: String,

    pub status: RelayStatus,

    /// Orthogonal hold on inbound content; only meaningful while active.
    #[sea_orm(default_value = false)]
    pub paused: bool,

    pub created_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub accepted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
