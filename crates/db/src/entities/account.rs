//! Local actor entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "account")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Username as chosen at registration.
    pub username: String,

    /// Lowercased username, unique for case-insensitive lookups.
    #[sea_orm(unique)]
    pub username_lower: String,

    /// Signing private key, PKCS#8 PEM. Persistent for the lifetime of the
    /// account; regenerating it breaks in-flight federation.
    #[sea_orm(column_type = "Text")]
    pub private_key_pem: String,

    /// Signing public key, PKIX PEM, advertised on the actor document.
    #[sea_orm(column_type = "Text")]
    pub public_key_pem: String,

    #[sea_orm(nullable)]
    pub display_name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,

    #[sea_orm(default_value = false)]
    pub is_admin: bool,

    /// Muted accounts are hidden from public listings; their notes still
    /// federate to explicit recipients.
    #[sea_orm(default_value = false)]
    pub muted: bool,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::note::Entity")]
    Note,

    #[sea_orm(has_many = "super::notification::Entity")]
    Notification,
}

impl Related<super::note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Note.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
