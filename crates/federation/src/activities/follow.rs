//! Follow activity.

use serde::{Deserialize, Serialize};
use url::Url;

use super::ObjectRef;
use crate::objects::url_or_embedded;

/// An incoming Follow: `actor` asks to follow `object`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FollowActivity {
    pub id: Url,
    #[serde(deserialize_with = "url_or_embedded")]
    pub actor: Url,
    pub object: ObjectRef,
}
