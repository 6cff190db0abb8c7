//! Typed incoming activities.
//!
//! The inbox accepts the common Activity Streams envelope first
//! (`type`, `id`, `actor`, `object`), then branches into a typed variant
//! per kind. The verbatim payload is kept alongside on the activity row
//! for passthrough fidelity.

mod accept;
mod announce;
mod create;
mod delete;
mod follow;
mod like;
mod undo;
mod update;

pub use accept::AcceptActivity;
pub use announce::AnnounceActivity;
pub use create::CreateActivity;
pub use delete::DeleteActivity;
pub use follow::FollowActivity;
pub use like::LikeActivity;
pub use undo::UndoActivity;
pub use update::UpdateActivity;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use starling_common::{AppError, AppResult};
use url::Url;

/// An activity `object` field: either a bare URI or an embedded object.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ObjectRef {
    Uri(Url),
    Object(Value),
}

impl ObjectRef {
    /// The URI of the referenced object, from the bare form or the
    /// embedded object's `id`.
    #[must_use]
    pub fn uri(&self) -> Option<Url> {
        match self {
            Self::Uri(url) => Some(url.clone()),
            Self::Object(value) => value
                .get("id")
                .and_then(Value::as_str)
                .and_then(|s| Url::parse(s).ok()),
        }
    }

    /// The embedded object, when present.
    #[must_use]
    pub const fn as_object(&self) -> Option<&Value> {
        match self {
            Self::Uri(_) => None,
            Self::Object(value) => Some(value),
        }
    }
}

/// A parsed incoming activity.
#[derive(Clone, Debug)]
pub enum IncomingActivity {
    Follow(FollowActivity),
    Accept(AcceptActivity),
    Undo(UndoActivity),
    Create(CreateActivity),
    Like(LikeActivity),
    Announce(AnnounceActivity),
    Update(UpdateActivity),
    Delete(DeleteActivity),
    /// A type this server does not process; accepted and dropped.
    Unknown { kind: String, id: Url, actor: Url },
}

/// Extract the `type` of a JSON-LD value, taking the first entry when the
/// field is an array.
fn type_of(value: &Value) -> Option<&str> {
    match value.get("type") {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Array(items)) => items.iter().find_map(Value::as_str),
        _ => None,
    }
}

fn required_url(value: &Value, field: &str) -> AppResult<Url> {
    let raw = match value.get(field) {
        Some(Value::String(s)) => s.as_str(),
        // Some implementations embed the actor object.
        Some(Value::Object(map)) => map
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Protocol(format!("missing {field}.id")))?,
        _ => return Err(AppError::Protocol(format!("missing {field}"))),
    };
    Url::parse(raw).map_err(|e| AppError::Protocol(format!("invalid {field}: {e}")))
}

impl IncomingActivity {
    /// Parse the envelope, then the kind-specific shape. Mandatory field
    /// violations surface as [`AppError::Protocol`].
    pub fn parse(raw: &Value) -> AppResult<Self> {
        let kind = type_of(raw)
            .ok_or_else(|| AppError::Protocol("missing activity type".to_string()))?
            .to_string();

        // Envelope fields are checked up front so every branch can rely
        // on them.
        let id = required_url(raw, "id")?;
        let actor = required_url(raw, "actor")?;

        let parse_err =
            |e: serde_json::Error| AppError::Protocol(format!("malformed {kind} activity: {e}"));

        Ok(match kind.as_str() {
            "Follow" => Self::Follow(serde_json::from_value(raw.clone()).map_err(parse_err)?),
            "Accept" => Self::Accept(serde_json::from_value(raw.clone()).map_err(parse_err)?),
            "Undo" => Self::Undo(serde_json::from_value(raw.clone()).map_err(parse_err)?),
            "Create" => Self::Create(serde_json::from_value(raw.clone()).map_err(parse_err)?),
            "Like" => Self::Like(serde_json::from_value(raw.clone()).map_err(parse_err)?),
            "Announce" => Self::Announce(serde_json::from_value(raw.clone()).map_err(parse_err)?),
            "Update" => Self::Update(serde_json::from_value(raw.clone()).map_err(parse_err)?),
            "Delete" => Self::Delete(serde_json::from_value(raw.clone()).map_err(parse_err)?),
            _ => Self::Unknown { kind, id, actor },
        })
    }

    /// The activity's own URI.
    #[must_use]
    pub const fn id(&self) -> &Url {
        match self {
            Self::Follow(a) => &a.id,
            Self::Accept(a) => &a.id,
            Self::Undo(a) => &a.id,
            Self::Create(a) => &a.id,
            Self::Like(a) => &a.id,
            Self::Announce(a) => &a.id,
            Self::Update(a) => &a.id,
            Self::Delete(a) => &a.id,
            Self::Unknown { id, .. } => id,
        }
    }

    /// The acting actor's URI.
    #[must_use]
    pub const fn actor(&self) -> &Url {
        match self {
            Self::Follow(a) => &a.actor,
            Self::Accept(a) => &a.actor,
            Self::Undo(a) => &a.actor,
            Self::Create(a) => &a.actor,
            Self::Like(a) => &a.actor,
            Self::Announce(a) => &a.actor,
            Self::Update(a) => &a.actor,
            Self::Delete(a) => &a.actor,
            Self::Unknown { actor, .. } => actor,
        }
    }

    /// The activity type as a string.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Follow(_) => "Follow",
            Self::Accept(_) => "Accept",
            Self::Undo(_) => "Undo",
            Self::Create(_) => "Create",
            Self::Like(_) => "Like",
            Self::Announce(_) => "Announce",
            Self::Update(_) => "Update",
            Self::Delete(_) => "Delete",
            Self::Unknown { kind, .. } => kind,
        }
    }

    /// The URI of the object the activity concerns, when derivable.
    #[must_use]
    pub fn object_uri(&self) -> Option<Url> {
        match self {
            Self::Follow(a) => a.object.uri(),
            Self::Accept(a) => a.object.uri(),
            Self::Undo(a) => a.object.uri(),
            Self::Create(a) => Some(a.object.id.clone()),
            Self::Like(a) => a.object.uri(),
            Self::Announce(a) => a.object.uri(),
            Self::Update(a) => a.object_uri(),
            Self::Delete(a) => a.object.uri(),
            Self::Unknown { .. } => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_follow() {
        let raw = json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "id": "https://m.example/activities/1",
            "type": "Follow",
            "actor": "https://m.example/users/bob",
            "object": "https://local.example/users/alice"
        });

        let parsed = IncomingActivity::parse(&raw).unwrap();
        assert_eq!(parsed.kind(), "Follow");
        assert_eq!(parsed.actor().as_str(), "https://m.example/users/bob");
        assert_eq!(
            parsed.object_uri().unwrap().as_str(),
            "https://local.example/users/alice"
        );
    }

    #[test]
    fn test_parse_type_array() {
        let raw = json!({
            "id": "https://m.example/activities/2",
            "type": ["Like"],
            "actor": "https://m.example/users/bob",
            "object": "https://local.example/notes/1"
        });

        let parsed = IncomingActivity::parse(&raw).unwrap();
        assert_eq!(parsed.kind(), "Like");
    }

    #[test]
    fn test_parse_embedded_actor_object() {
        let raw = json!({
            "id": "https://m.example/activities/3",
            "type": "Follow",
            "actor": {"id": "https://m.example/users/bob", "type": "Person"},
            "object": "https://local.example/users/alice"
        });

        let parsed = IncomingActivity::parse(&raw).unwrap();
        assert_eq!(parsed.actor().as_str(), "https://m.example/users/bob");
    }

    #[test]
    fn test_unknown_type_is_accepted() {
        let raw = json!({
            "id": "https://m.example/activities/4",
            "type": "Question",
            "actor": "https://m.example/users/bob",
            "object": {}
        });

        let parsed = IncomingActivity::parse(&raw).unwrap();
        assert!(matches!(parsed, IncomingActivity::Unknown { .. }));
    }

    #[test]
    fn test_missing_mandatory_field() {
        let raw = json!({
            "id": "https://m.example/activities/5",
            "type": "Follow",
            "object": "https://local.example/users/alice"
        });
        assert!(matches!(
            IncomingActivity::parse(&raw),
            Err(starling_common::AppError::Protocol(_))
        ));
    }
}
