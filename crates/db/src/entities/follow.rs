//! Follow edge entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "follow")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The following side; a local account id or remote actor id.
    pub follower_id: String,

    /// The followed side; a local account id or remote actor id.
    pub target_id: String,

    /// URI of the Follow activity that created this edge.
    pub uri: String,

    /// Outgoing follows stay false until the remote Accept arrives;
    /// incoming follows are accepted on creation.
    #[sea_orm(default_value = false)]
    pub accepted: bool,

    /// True when the follower is a local account.
    #[sea_orm(default_value = false)]
    pub is_local: bool,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
