//! The federated Note object.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::one_or_many;

/// A Note (or Article) object as carried inside Create and Update
/// activities, and served standalone from `/notes/{id}`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApNote {
    pub id: Url,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributed_to: Option<Url>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub published: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub to: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub cc: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub tag: Vec<ApTag>,
    #[serde(default)]
    pub in_reply_to: Option<Url>,
}

impl ApNote {
    /// Whether the object type is one we store as content.
    #[must_use]
    pub fn is_content(&self) -> bool {
        matches!(self.kind.as_str(), "Note" | "Article")
    }

    /// Mentions of local actors, as `(href, tag)` pairs.
    #[must_use]
    pub fn mentions(&self) -> Vec<&ApTag> {
        self.tag
            .iter()
            .filter(|tag| tag.kind == "Mention" && tag.href.is_some())
            .collect()
    }

    /// Parse an `ApNote` out of a raw JSON object.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }
}

/// A `tag` entry: a Mention or Hashtag.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ApTag {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub href: Option<Url>,
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_note_with_tags() {
        let raw = json!({
            "id": "https://m.example/notes/7",
            "type": "Note",
            "attributedTo": "https://m.example/users/alice",
            "content": "<p>hi <a href=\"https://local.example/users/bob\">@bob</a> #music</p>",
            "mediaType": "text/html",
            "to": "https://www.w3.org/ns/activitystreams#Public",
            "tag": [
                {"type": "Mention", "href": "https://local.example/users/bob", "name": "@bob@local.example"},
                {"type": "Hashtag", "name": "#music"}
            ],
            "inReplyTo": "https://local.example/notes/1"
        });

        let note = ApNote::from_value(&raw).unwrap();
        assert!(note.is_content());
        assert_eq!(note.to, vec!["https://www.w3.org/ns/activitystreams#Public"]);
        assert_eq!(note.mentions().len(), 1);
        assert_eq!(
            note.in_reply_to.unwrap().as_str(),
            "https://local.example/notes/1"
        );
    }

    #[test]
    fn test_single_tag_object() {
        let raw = json!({
            "id": "https://m.example/notes/8",
            "type": "Note",
            "content": "<p>x</p>",
            "tag": {"type": "Hashtag", "name": "#solo"}
        });

        let note = ApNote::from_value(&raw).unwrap();
        assert_eq!(note.tag.len(), 1);
    }
}
