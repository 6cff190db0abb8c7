//! Remote actor resolution and caching.
//!
//! WebFinger turns `user@domain` handles into actor URIs; actor documents
//! are fetched, validated and cached with a 24-hour TTL. A stale cached
//! row is better than no row: when a refresh fails the cached actor is
//! served and a warning logged.

use chrono::{Duration, Utc};
use sea_orm::ActiveValue::Set;
use serde_json::Value;
use starling_common::{AppError, AppResult, IdGenerator};
use starling_db::entities::remote_actor;
use starling_db::repositories::RemoteActorRepository;
use tracing::{debug, info, warn};
use url::Url;

use crate::client::ApClient;

/// How long a cached actor stays fresh.
pub const ACTOR_CACHE_TTL_HOURS: i64 = 24;

/// Fields pulled out of a fetched actor document.
#[derive(Debug, Clone)]
struct ParsedActor {
    actor_uri: String,
    username: String,
    domain: String,
    inbox_uri: String,
    shared_inbox_uri: Option<String>,
    public_key_pem: String,
    display_name: Option<String>,
    summary: Option<String>,
    avatar_url: Option<String>,
}

/// Resolves and caches remote actors.
#[derive(Clone)]
pub struct ActorResolver {
    remote_actors: RemoteActorRepository,
    client: ApClient,
    id_gen: IdGenerator,
}

impl ActorResolver {
    #[must_use]
    pub fn new(remote_actors: RemoteActorRepository, client: ApClient) -> Self {
        Self {
            remote_actors,
            client,
            id_gen: IdGenerator::new(),
        }
    }

    /// Resolve a `user@domain` handle to an actor URI via WebFinger.
    pub async fn resolve_handle(&self, user: &str, domain: &str) -> AppResult<String> {
        self.client.webfinger(user, domain).await
    }

    /// Resolve a handle all the way to a cached remote actor.
    pub async fn resolve_actor(&self, user: &str, domain: &str) -> AppResult<remote_actor::Model> {
        if let Some(cached) = self
            .remote_actors
            .find_by_username_domain(user, domain)
            .await?
            && !is_stale(&cached)
        {
            return Ok(cached);
        }
        let actor_uri = self.resolve_handle(user, domain).await?;
        self.get_or_fetch(&actor_uri).await
    }

    /// Return the cached actor when fresh, otherwise fetch and upsert.
    /// On fetch failure an existing stale row is returned rather than
    /// propagating the error.
    pub async fn get_or_fetch(&self, actor_uri: &str) -> AppResult<remote_actor::Model> {
        let cached = self.remote_actors.find_by_uri(actor_uri).await?;

        if let Some(actor) = &cached
            && !is_stale(actor)
        {
            debug!(actor_uri, "Actor cache hit");
            return Ok(actor.clone());
        }

        match self.fetch_and_store(actor_uri).await {
            Ok(actor) => Ok(actor),
            Err(err) => {
                if let Some(stale) = cached {
                    warn!(actor_uri, error = %err, "Actor refresh failed; serving stale cache");
                    return Ok(stale);
                }
                Err(err)
            }
        }
    }

    /// Re-fetch regardless of TTL; used when an Update{Person} arrives.
    pub async fn force_refresh(&self, actor_uri: &str) -> AppResult<remote_actor::Model> {
        self.fetch_and_store(actor_uri).await
    }

    async fn fetch_and_store(&self, actor_uri: &str) -> AppResult<remote_actor::Model> {
        info!(actor_uri, "Fetching remote actor");
        let document = self.client.fetch_actor(actor_uri).await?;
        let parsed = parse_actor_document(&document, actor_uri)?;

        // Prefer the row keyed by canonical URI; reconcile by handle when
        // a server moved an account to a new URI. Either way the internal
        // id is preserved so references stay valid.
        let existing = match self.remote_actors.find_by_uri(&parsed.actor_uri).await? {
            Some(row) => Some(row),
            None => {
                self.remote_actors
                    .find_by_username_domain(&parsed.username, &parsed.domain)
                    .await?
            }
        };

        if let Some(row) = existing {
            let mut active: remote_actor::ActiveModel = row.into();
            active.actor_uri = Set(parsed.actor_uri);
            active.username = Set(parsed.username);
            active.domain = Set(parsed.domain);
            active.inbox_uri = Set(parsed.inbox_uri);
            active.shared_inbox_uri = Set(parsed.shared_inbox_uri);
            active.public_key_pem = Set(parsed.public_key_pem);
            active.display_name = Set(parsed.display_name);
            active.summary = Set(parsed.summary);
            active.avatar_url = Set(parsed.avatar_url);
            active.last_fetched_at = Set(Utc::now());
            return self.remote_actors.update(active).await;
        }

        let model = remote_actor::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(parsed.username),
            domain: Set(parsed.domain),
            actor_uri: Set(parsed.actor_uri),
            inbox_uri: Set(parsed.inbox_uri),
            shared_inbox_uri: Set(parsed.shared_inbox_uri),
            public_key_pem: Set(parsed.public_key_pem),
            display_name: Set(parsed.display_name),
            summary: Set(parsed.summary),
            avatar_url: Set(parsed.avatar_url),
            last_fetched_at: Set(Utc::now()),
        };
        self.remote_actors.create(model).await
    }
}

fn is_stale(actor: &remote_actor::Model) -> bool {
    Utc::now() - actor.last_fetched_at > Duration::hours(ACTOR_CACHE_TTL_HOURS)
}

/// Validate and flatten a fetched actor document. Empty required fields
/// surface as [`AppError::ActorInvalid`].
fn parse_actor_document(document: &Value, requested_uri: &str) -> AppResult<ParsedActor> {
    let id = document
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::ActorInvalid(format!("{requested_uri}: missing id")))?;

    let inbox = document
        .get("inbox")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::ActorInvalid(format!("{requested_uri}: missing inbox")))?;

    let public_key_pem = document
        .get("publicKey")
        .and_then(|pk| pk.get("publicKeyPem"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::ActorInvalid(format!("{requested_uri}: missing public key")))?;

    let parsed_id = Url::parse(id)
        .map_err(|e| AppError::ActorInvalid(format!("{requested_uri}: invalid id: {e}")))?;
    let domain = parsed_id
        .host_str()
        .ok_or_else(|| AppError::ActorInvalid(format!("{requested_uri}: id has no host")))?
        .to_string();

    let username = document
        .get("preferredUsername")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map_or_else(
            || {
                // Fall back to the last path segment; relay actors often
                // lack a preferredUsername.
                parsed_id
                    .path_segments()
                    .and_then(|mut segments| segments.next_back())
                    .unwrap_or("actor")
                    .to_string()
            },
            std::string::ToString::to_string,
        );

    let shared_inbox_uri = document
        .get("endpoints")
        .and_then(|e| e.get("sharedInbox"))
        .and_then(Value::as_str)
        .map(String::from)
        .or_else(|| {
            document
                .get("sharedInbox")
                .and_then(Value::as_str)
                .map(String::from)
        });

    let display_name = document.get("name").and_then(Value::as_str).map(String::from);
    let summary = document
        .get("summary")
        .and_then(Value::as_str)
        .map(String::from);
    let avatar_url = document
        .get("icon")
        .and_then(|icon| {
            if icon.is_object() {
                icon.get("url").and_then(Value::as_str)
            } else {
                icon.as_str()
            }
        })
        .map(String::from);

    Ok(ParsedActor {
        actor_uri: id.to_string(),
        username,
        domain,
        inbox_uri: inbox.to_string(),
        shared_inbox_uri,
        public_key_pem: public_key_pem.to_string(),
        display_name,
        summary,
        avatar_url,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_actor_document() {
        let document = json!({
            "id": "https://m.example/users/bob",
            "type": "Person",
            "preferredUsername": "bob",
            "name": "Bob",
            "inbox": "https://m.example/users/bob/inbox",
            "endpoints": {"sharedInbox": "https://m.example/inbox"},
            "publicKey": {
                "id": "https://m.example/users/bob#main-key",
                "owner": "https://m.example/users/bob",
                "publicKeyPem": "-----BEGIN PUBLIC KEY-----\nxxx\n-----END PUBLIC KEY-----"
            },
            "icon": {"type": "Image", "url": "https://m.example/avatars/bob.png"}
        });

        let parsed = parse_actor_document(&document, "https://m.example/users/bob").unwrap();
        assert_eq!(parsed.username, "bob");
        assert_eq!(parsed.domain, "m.example");
        assert_eq!(parsed.inbox_uri, "https://m.example/users/bob/inbox");
        assert_eq!(
            parsed.shared_inbox_uri.as_deref(),
            Some("https://m.example/inbox")
        );
        assert_eq!(
            parsed.avatar_url.as_deref(),
            Some("https://m.example/avatars/bob.png")
        );
    }

    #[test]
    fn test_parse_actor_missing_key_is_invalid() {
        let document = json!({
            "id": "https://m.example/users/bob",
            "inbox": "https://m.example/users/bob/inbox"
        });
        let err = parse_actor_document(&document, "https://m.example/users/bob").unwrap_err();
        assert!(matches!(err, AppError::ActorInvalid(_)));
    }

    #[test]
    fn test_relay_actor_without_preferred_username() {
        let document = json!({
            "id": "https://relay.fedi.example/actor",
            "type": "Application",
            "inbox": "https://relay.fedi.example/inbox",
            "publicKey": {"publicKeyPem": "-----BEGIN PUBLIC KEY-----\nxxx\n-----END PUBLIC KEY-----"}
        });
        let parsed =
            parse_actor_document(&document, "https://relay.fedi.example/actor").unwrap();
        assert_eq!(parsed.username, "actor");
        assert_eq!(parsed.domain, "relay.fedi.example");
    }
}
