//! Incoming Create processing.

use starling_common::{AppResult, config::FederationConfig};
use starling_db::entities::notification::NotificationKind;
use starling_db::entities::remote_actor;
use starling_db::repositories::{
    AccountRepository, ActivityRepository, EngagementRepository, FollowRepository, NoteRepository,
};
use tracing::{debug, info};

use super::local_username_from_uri;
use crate::CreateActivity;
use crate::notify::{Notifier, NotifyActor, NotifyNote};

/// Processor for incoming Create activities carrying Notes.
///
/// A Create is kept when a local actor follows its author, when it came
/// in relay-forwarded, or when it replies to a locally owned note;
/// anything else is dropped without side effects.
#[derive(Clone)]
pub struct CreateProcessor {
    config: FederationConfig,
    accounts: AccountRepository,
    notes: NoteRepository,
    activities: ActivityRepository,
    follows: FollowRepository,
    engagement: EngagementRepository,
    notifier: Notifier,
}

impl CreateProcessor {
    #[must_use]
    pub const fn new(
        config: FederationConfig,
        accounts: AccountRepository,
        notes: NoteRepository,
        activities: ActivityRepository,
        follows: FollowRepository,
        engagement: EngagementRepository,
        notifier: Notifier,
    ) -> Self {
        Self {
            config,
            accounts,
            notes,
            activities,
            follows,
            engagement,
            notifier,
        }
    }

    pub async fn process(
        &self,
        activity: &CreateActivity,
        signer: &remote_actor::Model,
        relay_forward: bool,
        activity_row_id: &str,
    ) -> AppResult<()> {
        let object = &activity.object;
        if !object.is_content() {
            debug!(kind = %object.kind, "Create with non-content object; dropping");
            self.activities.delete(activity_row_id).await?;
            return Ok(());
        }

        let reply_parent = match &object.in_reply_to {
            Some(parent) => self.notes.find_by_uri(parent.as_str()).await?,
            None => None,
        };

        let followed = self.follows.local_follower_exists(&signer.id).await?;
        if !followed && !relay_forward && reply_parent.is_none() {
            debug!(
                actor = %activity.actor,
                object = %object.id,
                "Create from unfollowed actor; dropping"
            );
            self.activities.delete(activity_row_id).await?;
            return Ok(());
        }

        info!(object = %object.id, relay_forward, "Create stored");

        // Replies count against the parent. A parent deleted locally is
        // stored without a counter update.
        if let Some(parent_uri) = &object.in_reply_to {
            let counted = self
                .engagement
                .increment_reply_count(parent_uri.as_str())
                .await?;
            if !counted {
                debug!(parent = %parent_uri, "Reply parent not found; stored without counter");
            }
            if let Some(parent) = &reply_parent {
                self.notifier
                    .notify(
                        &parent.author_id,
                        NotificationKind::Reply,
                        &NotifyActor::from(signer),
                        NotifyNote::remote(object.id.as_str(), object.content.as_deref()),
                    )
                    .await?;
            }
        }

        // Mentions of local actors notify their targets.
        for tag in object.mentions() {
            let Some(href) = &tag.href else { continue };
            let Some(username) = local_username_from_uri(&self.config, href) else {
                continue;
            };
            if let Some(local) = self.accounts.find_by_username(&username).await? {
                self.notifier
                    .notify(
                        &local.id,
                        NotificationKind::Mention,
                        &NotifyActor::from(signer),
                        NotifyNote::remote(object.id.as_str(), object.content.as_deref()),
                    )
                    .await?;
            }
        }

        Ok(())
    }
}
