//! Accept activity.

use serde::{Deserialize, Serialize};
use url::Url;

use super::ObjectRef;
use crate::objects::url_or_embedded;

/// An incoming Accept, answering one of our Follows. The object is the
/// original Follow, embedded or by URI.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AcceptActivity {
    pub id: Url,
    #[serde(deserialize_with = "url_or_embedded")]
    pub actor: Url,
    pub object: ObjectRef,
}
