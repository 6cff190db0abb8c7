//! Notification entity.
//!
//! Actor and note fields are denormalized so notifications stay renderable
//! after the remote actor cache evicts or the note is deleted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum NotificationKind {
    #[sea_orm(string_value = "follow")]
    Follow,
    #[sea_orm(string_value = "like")]
    Like,
    #[sea_orm(string_value = "reply")]
    Reply,
    #[sea_orm(string_value = "mention")]
    Mention,
    #[sea_orm(string_value = "boost")]
    Boost,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The local account receiving the notification.
    #[sea_orm(indexed)]
    pub recipient_id: String,

    pub kind: NotificationKind,

    /// The actor who triggered the notification.
    pub actor_id: String,

    pub actor_username: String,

    /// Actor's domain; absent for local actors.
    #[sea_orm(nullable)]
    pub actor_domain: Option<String>,

    #[sea_orm(nullable)]
    pub note_id: Option<String>,

    #[sea_orm(nullable)]
    pub note_uri: Option<String>,

    /// Short plain-text snippet of the note involved.
    #[sea_orm(nullable)]
    pub note_preview: Option<String>,

    #[sea_orm(default_value = false)]
    pub read: bool,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::RecipientId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    Recipient,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
