//! Create activity.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::objects::{ApNote, one_or_many, url_or_embedded};

/// An incoming Create carrying a Note (or Article) object.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CreateActivity {
    pub id: Url,
    #[serde(deserialize_with = "url_or_embedded")]
    pub actor: Url,
    #[serde(default)]
    pub published: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub to: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub cc: Vec<String>,
    pub object: ApNote,
}
