//! Received activity cache entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Globally unique activity id; duplicate delivery is a no-op.
    #[sea_orm(unique)]
    pub activity_uri: String,

    /// Activity Streams type (Create, Follow, Like, ...).
    pub activity_type: String,

    pub actor_uri: String,

    /// URI of the object the activity concerns, when it has one.
    #[sea_orm(nullable, indexed)]
    pub object_uri: Option<String>,

    /// Verbatim payload, kept for passthrough fidelity on Update.
    #[sea_orm(column_type = "Json")]
    pub raw_json: Json,

    pub received_at: DateTimeUtc,

    #[sea_orm(default_value = false)]
    pub processed: bool,

    /// Set when the content arrived via a subscribed relay.
    #[sea_orm(default_value = false, indexed)]
    pub from_relay: bool,

    /// Reply count (denormalized, for federated content engagement).
    #[sea_orm(default_value = 0)]
    pub reply_count: i32,

    /// Like count (denormalized).
    #[sea_orm(default_value = 0)]
    pub like_count: i32,

    /// Boost count (denormalized).
    #[sea_orm(default_value = 0)]
    pub boost_count: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
