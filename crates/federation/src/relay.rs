//! Relay subscriptions.
//!
//! Relays are third-party actors that re-announce public content.
//! Subscription is a Follow of `as:Public` sent to the relay's inbox;
//! the relay answers with an Accept. `paused` is an orthogonal hold on
//! inbound content and does not affect the handshake.

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use serde_json::json;
use starling_common::{AppError, AppResult, IdGenerator, config::FederationConfig};
use starling_db::entities::relay::{self, RelayStatus};
use starling_db::entities::account;
use starling_db::repositories::{ActivityRepository, RelayRepository};
use tracing::{info, warn};
use url::Url;

use crate::objects::{ACTIVITYSTREAMS_CONTEXT, PUBLIC};
use crate::outbox::OutboxService;
use crate::resolver::ActorResolver;

/// Drives the relay subscription state machine.
#[derive(Clone)]
pub struct RelayController {
    config: FederationConfig,
    relays: RelayRepository,
    activities: ActivityRepository,
    resolver: ActorResolver,
    outbox: OutboxService,
    id_gen: IdGenerator,
}

impl RelayController {
    #[must_use]
    pub fn new(
        config: FederationConfig,
        relays: RelayRepository,
        activities: ActivityRepository,
        resolver: ActorResolver,
        outbox: OutboxService,
    ) -> Self {
        Self {
            config,
            relays,
            activities,
            resolver,
            outbox,
            id_gen: IdGenerator::new(),
        }
    }

    /// Subscribe to a relay. The URL is normalized (`https://` scheme,
    /// `/actor` path), the relay actor fetched, and a Follow of
    /// `as:Public` enqueued; the record stays `pending` until the relay
    /// accepts.
    pub async fn subscribe(
        &self,
        admin: &account::Model,
        url: &str,
    ) -> AppResult<relay::Model> {
        let actor_url = normalize_relay_url(url)?;
        let actor = self.resolver.get_or_fetch(actor_url.as_str()).await?;

        if let Some(existing) = self.relays.find_by_actor_uri(&actor.actor_uri).await? {
            match existing.status {
                RelayStatus::Active => return Err(AppError::AlreadySubscribed),
                RelayStatus::Pending => return Err(AppError::SubscriptionPending),
                RelayStatus::Failed => {
                    // A failed attempt does not block a fresh one.
                    self.relays.delete(&existing.id).await?;
                }
            }
        }

        let follow_uri = format!(
            "https://{}/activities/{}",
            self.config.local_domain,
            self.id_gen.generate()
        );
        let name = actor
            .display_name
            .clone()
            .unwrap_or_else(|| actor.domain.clone());

        let record = self
            .relays
            .create(relay::ActiveModel {
                id: Set(self.id_gen.generate()),
                actor_uri: Set(actor.actor_uri.clone()),
                inbox_uri: Set(actor.inbox_uri.clone()),
                follow_uri: Set(follow_uri.clone()),
                name: Set(name),
                status: Set(RelayStatus::Pending),
                paused: Set(false),
                created_at: Set(Utc::now()),
                accepted_at: Set(None),
            })
            .await?;

        // `as:Public` as the follow object works for both hashtag and
        // firehose relays.
        let activity = json!({
            "@context": ACTIVITYSTREAMS_CONTEXT,
            "id": follow_uri,
            "type": "Follow",
            "actor": self.outbox.actor_uri(&admin.username),
            "object": PUBLIC,
        });
        self.outbox.enqueue_one(&actor.inbox_uri, &activity).await?;

        info!(relay = %record.actor_uri, "Relay subscription requested");
        Ok(record)
    }

    /// Handle an Accept signed by a relay: `pending -> active`. The
    /// transition also fires for paused relays; pause only gates content.
    pub async fn accept_from_relay(&self, signer_uri: &Url) -> AppResult<bool> {
        let Some(record) = self.find_matching(signer_uri).await? else {
            return Ok(false);
        };
        if record.status == RelayStatus::Active {
            return Ok(true);
        }
        self.relays.set_active(&record.id, Utc::now()).await?;
        info!(relay = %record.actor_uri, "Relay subscription active");
        Ok(true)
    }

    pub async fn pause(&self, id: &str) -> AppResult<()> {
        self.relays.set_paused(id, true).await
    }

    pub async fn resume(&self, id: &str) -> AppResult<()> {
        self.relays.set_paused(id, false).await
    }

    /// Mark a pending subscription failed (e.g. after the Follow was
    /// abandoned by the delivery worker).
    pub async fn mark_failed(&self, id: &str) -> AppResult<()> {
        self.relays.set_failed(id).await
    }

    /// Unsubscribe: enqueue an Undo referencing the original Follow, then
    /// drop the record.
    pub async fn unsubscribe(&self, admin: &account::Model, id: &str) -> AppResult<()> {
        let record = self.relays.get_by_id(id).await?;

        let actor_uri = self.outbox.actor_uri(&admin.username);
        let activity = json!({
            "@context": ACTIVITYSTREAMS_CONTEXT,
            "id": format!(
                "https://{}/activities/{}",
                self.config.local_domain,
                self.id_gen.generate()
            ),
            "type": "Undo",
            "actor": actor_uri,
            "object": {
                "id": record.follow_uri,
                "type": "Follow",
                "actor": actor_uri,
                "object": PUBLIC,
            },
        });
        self.outbox.enqueue_one(&record.inbox_uri, &activity).await?;
        self.relays.delete(&record.id).await?;

        info!(relay = %record.actor_uri, "Relay unsubscribed");
        Ok(())
    }

    /// Drop every activity this relay forwarded, matched by actor URI or
    /// by the relay's host.
    pub async fn purge_content(&self, id: &str) -> AppResult<u64> {
        let record = self.relays.get_by_id(id).await?;
        let domain = host_of(&record.actor_uri)?;
        let purged = self
            .activities
            .purge_relay_content(&record.actor_uri, &domain)
            .await?;
        info!(relay = %record.actor_uri, purged, "Relay content purged");
        Ok(purged)
    }

    pub async fn list(&self) -> AppResult<Vec<relay::Model>> {
        self.relays.list().await
    }

    /// Match an actor URI against persisted relays: exact actor URI first,
    /// then by host — some relays announce from per-tag sub-actors whose
    /// path differs but whose host matches.
    pub async fn find_matching(&self, actor_uri: &Url) -> AppResult<Option<relay::Model>> {
        if let Some(exact) = self.relays.find_by_actor_uri(actor_uri.as_str()).await? {
            return Ok(Some(exact));
        }
        let Some(host) = actor_uri.host_str() else {
            return Ok(None);
        };
        for record in self.relays.list().await? {
            match host_of(&record.actor_uri) {
                Ok(record_host) if record_host == host => return Ok(Some(record)),
                Ok(_) => {}
                Err(err) => warn!(relay = %record.actor_uri, error = %err, "Bad relay URI"),
            }
        }
        Ok(None)
    }

    /// Like [`find_matching`], restricted to subscribed (active) relays.
    ///
    /// [`find_matching`]: Self::find_matching
    pub async fn find_subscribed(&self, actor_uri: &Url) -> AppResult<Option<relay::Model>> {
        Ok(self
            .find_matching(actor_uri)
            .await?
            .filter(|record| record.status == RelayStatus::Active))
    }
}

fn host_of(uri: &str) -> AppResult<String> {
    let parsed = Url::parse(uri)?;
    parsed
        .host_str()
        .map(std::string::ToString::to_string)
        .ok_or_else(|| AppError::Protocol(format!("URI without host: {uri}")))
}

/// Normalize operator input to a relay actor URL: add the `https://`
/// scheme and default the path to `/actor`.
fn normalize_relay_url(input: &str) -> AppResult<Url> {
    let trimmed = input.trim();
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let mut url = Url::parse(&with_scheme)
        .map_err(|e| AppError::Validation(format!("invalid relay URL {input}: {e}")))?;
    if url.path() == "/" || url.path().is_empty() {
        url.set_path("/actor");
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_relay_url() {
        assert_eq!(
            normalize_relay_url("relay.fedi.example").unwrap().as_str(),
            "https://relay.fedi.example/actor"
        );
        assert_eq!(
            normalize_relay_url("https://relay.fedi.example/").unwrap().as_str(),
            "https://relay.fedi.example/actor"
        );
        assert_eq!(
            normalize_relay_url("https://relay.fedi.example/inbox").unwrap().as_str(),
            "https://relay.fedi.example/inbox"
        );
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert!(normalize_relay_url("not a url").is_err());
    }
}
