//! Delete activity.

use serde::{Deserialize, Serialize};
use url::Url;

use super::ObjectRef;
use crate::objects::url_or_embedded;

/// An incoming Delete of an actor (object equals the actor itself) or of
/// an object, referenced by URI or as a Tombstone.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DeleteActivity {
    pub id: Url,
    #[serde(deserialize_with = "url_or_embedded")]
    pub actor: Url,
    pub object: ObjectRef,
}

impl DeleteActivity {
    /// Whether this deletes the acting actor itself.
    #[must_use]
    pub fn is_self_delete(&self) -> bool {
        self.object.uri().is_some_and(|uri| uri == self.actor)
    }
}
