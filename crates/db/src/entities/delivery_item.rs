//! Delivery queue entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "delivery_item")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub inbox_uri: String,

    /// The signed-and-POSTed payload.
    #[sea_orm(column_type = "Json")]
    pub activity_json: Json,

    /// Failed attempts so far; rows reaching the attempt cap are deleted.
    #[sea_orm(default_value = 0)]
    pub attempts: i32,

    #[sea_orm(indexed)]
    pub next_retry_at: DateTimeUtc,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
