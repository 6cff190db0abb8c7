//! Undo activity.

use serde::{Deserialize, Serialize};
use url::Url;

use super::ObjectRef;
use crate::objects::url_or_embedded;

/// An incoming Undo. The inner object (a Follow, Like or Announce,
/// usually embedded) decides what is being retracted.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UndoActivity {
    pub id: Url,
    #[serde(deserialize_with = "url_or_embedded")]
    pub actor: Url,
    pub object: ObjectRef,
}

impl UndoActivity {
    /// The type of the inner activity, when the object is embedded.
    #[must_use]
    pub fn inner_kind(&self) -> Option<&str> {
        self.object
            .as_object()
            .and_then(|o| o.get("type"))
            .and_then(serde_json::Value::as_str)
    }

    /// The inner activity's own URI.
    #[must_use]
    pub fn inner_uri(&self) -> Option<Url> {
        self.object.uri()
    }

    /// The object the inner activity pointed at (`object.object`).
    #[must_use]
    pub fn inner_object_uri(&self) -> Option<Url> {
        let inner = self.object.as_object()?;
        match inner.get("object") {
            Some(serde_json::Value::String(s)) => Url::parse(s).ok(),
            Some(serde_json::Value::Object(map)) => map
                .get("id")
                .and_then(serde_json::Value::as_str)
                .and_then(|s| Url::parse(s).ok()),
            _ => None,
        }
    }
}
