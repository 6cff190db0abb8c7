//! Announce activity.

use serde::{Deserialize, Serialize};
use url::Url;

use super::ObjectRef;
use crate::objects::url_or_embedded;

/// An incoming Announce: a boost of one of our notes, or — when signed by
/// a subscribed relay — forwarded third-party content.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AnnounceActivity {
    pub id: Url,
    #[serde(deserialize_with = "url_or_embedded")]
    pub actor: Url,
    pub object: ObjectRef,
}
