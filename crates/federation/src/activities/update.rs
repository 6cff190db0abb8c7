//! Update activity.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::objects::url_or_embedded;

/// An incoming Update: an actor profile refresh (`object.type = Person`)
/// or an edit of a previously received object.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UpdateActivity {
    pub id: Url,
    #[serde(deserialize_with = "url_or_embedded")]
    pub actor: Url,
    pub object: Value,
}

impl UpdateActivity {
    /// Type of the updated object.
    #[must_use]
    pub fn object_kind(&self) -> Option<&str> {
        match self.object.get("type") {
            Some(Value::String(s)) => Some(s.as_str()),
            Some(Value::Array(items)) => items.iter().find_map(Value::as_str),
            _ => None,
        }
    }

    /// URI of the updated object.
    #[must_use]
    pub fn object_uri(&self) -> Option<Url> {
        match &self.object {
            Value::String(s) => Url::parse(s).ok(),
            Value::Object(map) => map
                .get("id")
                .and_then(Value::as_str)
                .and_then(|s| Url::parse(s).ok()),
            _ => None,
        }
    }
}
