//! Incoming Follow processing.

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use serde_json::Value;
use starling_common::{AppError, AppResult, IdGenerator, config::FederationConfig};
use starling_db::entities::notification::NotificationKind;
use starling_db::entities::{follow, remote_actor};
use starling_db::repositories::{AccountRepository, FollowRepository};
use tracing::info;

use super::local_username_from_uri;
use crate::FollowActivity;
use crate::notify::{Notifier, NotifyActor, NotifyNote};
use crate::outbox::OutboxService;

/// Processor for incoming Follow activities. Incoming follows are
/// auto-accepted: the edge is created `accepted = true` and an Accept is
/// enqueued to the follower's inbox.
#[derive(Clone)]
pub struct FollowProcessor {
    config: FederationConfig,
    accounts: AccountRepository,
    follows: FollowRepository,
    outbox: OutboxService,
    notifier: Notifier,
    id_gen: IdGenerator,
}

impl FollowProcessor {
    #[must_use]
    pub fn new(
        config: FederationConfig,
        accounts: AccountRepository,
        follows: FollowRepository,
        outbox: OutboxService,
        notifier: Notifier,
    ) -> Self {
        Self {
            config,
            accounts,
            follows,
            outbox,
            notifier,
            id_gen: IdGenerator::new(),
        }
    }

    pub async fn process(
        &self,
        activity: &FollowActivity,
        signer: &remote_actor::Model,
        raw: &Value,
    ) -> AppResult<()> {
        let object_uri = activity
            .object
            .uri()
            .ok_or_else(|| AppError::Protocol("Follow without object".to_string()))?;
        let username = local_username_from_uri(&self.config, &object_uri)
            .ok_or_else(|| AppError::NotFound(format!("not a local actor: {object_uri}")))?;
        let target = self.accounts.get_by_username(&username).await?;

        let already_following = match self.follows.find_by_pair(&signer.id, &target.id).await? {
            Some(_) => true,
            None => {
                let created = self
                    .follows
                    .create(follow::ActiveModel {
                        id: Set(self.id_gen.generate()),
                        follower_id: Set(signer.id.clone()),
                        target_id: Set(target.id.clone()),
                        uri: Set(activity.id.to_string()),
                        accepted: Set(true),
                        is_local: Set(false),
                        created_at: Set(Utc::now()),
                    })
                    .await;
                match created {
                    Ok(_) => false,
                    // Concurrent delivery of the same follow; the edge exists.
                    Err(AppError::DuplicateKey(_)) => true,
                    Err(err) => return Err(err),
                }
            }
        };

        if already_following {
            info!(
                follower = %signer.actor_uri,
                target = %target.username,
                "Follow already exists; re-sending Accept"
            );
        } else {
            self.notifier
                .notify(
                    &target.id,
                    NotificationKind::Follow,
                    &NotifyActor::from(signer),
                    NotifyNote::default(),
                )
                .await?;
            info!(
                follower = %signer.actor_uri,
                target = %target.username,
                "Follow accepted"
            );
        }

        // The Accept references the incoming Follow verbatim so the
        // remote side can correlate it.
        self.outbox.send_accept(&target, signer, raw).await
    }
}
