//! Boost (Announce) entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "boost")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The boosting actor; a local account id or remote actor id.
    pub account_id: String,

    /// Set when the target is a local note.
    #[sea_orm(nullable)]
    pub note_id: Option<String>,

    /// Set when the target is federated content.
    #[sea_orm(nullable)]
    pub object_uri: Option<String>,

    /// URI of the Announce activity, referenced by Undo.
    pub uri: String,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
