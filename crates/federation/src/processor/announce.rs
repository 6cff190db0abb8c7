//! Incoming Announce processing.

use chrono::Utc;
use serde_json::Value;
use starling_common::{AppError, AppResult};
use starling_db::entities::notification::NotificationKind;
use starling_db::entities::{relay, remote_actor};
use starling_db::repositories::{
    ActivityRepository, EngagementRepository, EngagementTarget, NoteRepository,
};
use tracing::{debug, info, warn};

use crate::AnnounceActivity;
use crate::client::ApClient;
use crate::notify::{Notifier, NotifyActor, NotifyNote};
use crate::objects::ApNote;

/// Processor for incoming Announce activities.
///
/// An Announce signed by a subscribed relay is forwarded content: the
/// announced object is stored as a `Create` activity flagged
/// `from_relay`. Any other Announce is a boost of a local note.
#[derive(Clone)]
pub struct AnnounceProcessor {
    notes: NoteRepository,
    activities: ActivityRepository,
    engagement: EngagementRepository,
    notifier: Notifier,
    client: ApClient,
}

impl AnnounceProcessor {
    #[must_use]
    pub const fn new(
        notes: NoteRepository,
        activities: ActivityRepository,
        engagement: EngagementRepository,
        notifier: Notifier,
        client: ApClient,
    ) -> Self {
        Self {
            notes,
            activities,
            engagement,
            notifier,
            client,
        }
    }

    pub async fn process(
        &self,
        activity: &AnnounceActivity,
        signer: &remote_actor::Model,
        matched_relay: Option<&relay::Model>,
        activity_row_id: &str,
    ) -> AppResult<()> {
        if let Some(relay) = matched_relay {
            return self.store_relay_content(activity, relay, activity_row_id).await;
        }
        self.process_boost(activity, signer).await
    }

    /// Relay-forwarded Announce: resolve the object (embedded or fetched)
    /// and rewrite the stored row into its Create.
    async fn store_relay_content(
        &self,
        activity: &AnnounceActivity,
        relay: &relay::Model,
        activity_row_id: &str,
    ) -> AppResult<()> {
        // Inbox gating catches forwarded content from paused relays; this
        // covers a paused relay announcing under its own actor.
        if relay.paused {
            debug!(relay = %relay.actor_uri, "Paused relay announce dropped");
            self.activities.delete(activity_row_id).await?;
            return Ok(());
        }

        let object_json: Value = match activity.object.as_object() {
            Some(embedded) => embedded.clone(),
            None => {
                let Some(uri) = activity.object.uri() else {
                    return Err(AppError::Protocol("Announce without object".to_string()));
                };
                match self.client.fetch_object(uri.as_str()).await {
                    Ok(fetched) => fetched,
                    Err(err) => {
                        warn!(object = %uri, error = %err, "Relay object fetch failed; dropping");
                        self.activities.delete(activity_row_id).await?;
                        return Ok(());
                    }
                }
            }
        };

        let note = match ApNote::from_value(&object_json) {
            Ok(note) if note.is_content() => note,
            Ok(note) => {
                debug!(kind = %note.kind, "Relay forwarded non-content object; dropping");
                self.activities.delete(activity_row_id).await?;
                return Ok(());
            }
            Err(err) => {
                warn!(relay = %relay.actor_uri, error = %err, "Malformed relay object; dropping");
                self.activities.delete(activity_row_id).await?;
                return Ok(());
            }
        };

        self.activities
            .convert_to_create(
                activity_row_id,
                note.id.to_string(),
                object_json,
                true,
            )
            .await?;

        info!(
            relay = %relay.actor_uri,
            object = %note.id,
            "Relay content stored"
        );
        Ok(())
    }

    /// Standard boost of a local note.
    async fn process_boost(
        &self,
        activity: &AnnounceActivity,
        signer: &remote_actor::Model,
    ) -> AppResult<()> {
        let Some(object_uri) = activity.object.uri() else {
            return Err(AppError::Protocol("Announce without object".to_string()));
        };

        let Some(note) = self.notes.find_by_uri(object_uri.as_str()).await? else {
            debug!(object = %object_uri, "Announce for unknown note; ignoring");
            return Ok(());
        };

        let inserted = self
            .engagement
            .add_boost(
                &signer.id,
                &EngagementTarget::Note(note.id.clone()),
                activity.id.as_str(),
                Utc::now(),
            )
            .await?;

        if inserted {
            info!(note = %note.id, actor = %signer.actor_uri, "Note boosted");
            self.notifier
                .notify(
                    &note.author_id,
                    NotificationKind::Boost,
                    &NotifyActor::from(signer),
                    NotifyNote::local(&note.id, &note.object_uri, &note.body),
                )
                .await?;
        } else {
            debug!(note = %note.id, "Duplicate boost; ignoring");
        }
        Ok(())
    }
}
