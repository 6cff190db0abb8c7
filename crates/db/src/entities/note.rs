//! Local note entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Note visibility levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Visibility {
    #[sea_orm(string_value = "public")]
    Public,
    #[sea_orm(string_value = "unlisted")]
    Unlisted,
    #[sea_orm(string_value = "followers")]
    Followers,
    #[sea_orm(string_value = "direct")]
    Direct,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "note")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub author_id: String,

    /// Note text as written (markup, not HTML).
    #[sea_orm(column_type = "Text")]
    pub body: String,

    pub visibility: Visibility,

    /// URI of the note this replies to, local or remote.
    #[sea_orm(nullable, indexed)]
    pub in_reply_to_uri: Option<String>,

    /// Canonical ActivityPub id, self-generated.
    #[sea_orm(unique)]
    pub object_uri: String,

    /// Reply count (denormalized).
    #[sea_orm(default_value = 0)]
    pub reply_count: i32,

    /// Like count (denormalized).
    #[sea_orm(default_value = 0)]
    pub like_count: i32,

    /// Boost count (denormalized).
    #[sea_orm(default_value = 0)]
    pub boost_count: i32,

    pub created_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub edited_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AuthorId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
