//! Cached remote actor entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "remote_actor")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub username: String,

    /// Host the actor lives on, derived from the actor URI.
    pub domain: String,

    /// Canonical ActivityPub id.
    #[sea_orm(unique)]
    pub actor_uri: String,

    pub inbox_uri: String,

    #[sea_orm(nullable)]
    pub shared_inbox_uri: Option<String>,

    /// Advertised signing key, kept for signature verification.
    #[sea_orm(column_type = "Text")]
    pub public_key_pem: String,

    #[sea_orm(nullable)]
    pub display_name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,

    #[sea_orm(nullable)]
    pub avatar_url: Option<String>,

    /// Refresh watermark; rows older than the cache TTL are re-fetched.
    pub last_fetched_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
