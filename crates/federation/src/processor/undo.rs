//! Incoming Undo processing.

use starling_common::{AppError, AppResult};
use starling_db::entities::remote_actor;
use starling_db::repositories::{EngagementRepository, FollowRepository};
use tracing::{debug, info};

use crate::UndoActivity;

/// Processor for incoming Undo activities. The inner object decides what
/// is retracted; in every case the signer must own the state being
/// removed.
#[derive(Clone)]
pub struct UndoProcessor {
    follows: FollowRepository,
    engagement: EngagementRepository,
}

impl UndoProcessor {
    #[must_use]
    pub const fn new(follows: FollowRepository, engagement: EngagementRepository) -> Self {
        Self { follows, engagement }
    }

    pub async fn process(
        &self,
        activity: &UndoActivity,
        signer: &remote_actor::Model,
    ) -> AppResult<()> {
        match activity.inner_kind() {
            Some("Follow") => self.undo_follow(activity, signer).await,
            Some("Like") => self.undo_like(activity, signer).await,
            Some("Announce") => self.undo_announce(activity, signer).await,
            Some(other) => {
                debug!(kind = other, "Undo of unsupported type; ignoring");
                Ok(())
            }
            // Bare URI: probe follow, like, boost in turn.
            None => self.undo_by_uri(activity, signer).await,
        }
    }

    async fn undo_follow(
        &self,
        activity: &UndoActivity,
        signer: &remote_actor::Model,
    ) -> AppResult<()> {
        let edge = match activity.inner_uri() {
            Some(uri) => self.follows.find_by_uri(uri.as_str()).await?,
            None => None,
        };
        let Some(edge) = edge else {
            debug!("Undo Follow for unknown edge; ignoring");
            return Ok(());
        };

        // Only the follow's own actor may retract it.
        if edge.follower_id != signer.id {
            return Err(AppError::AuthorizationDenied(format!(
                "Undo Follow from {} for an edge owned by another actor",
                signer.actor_uri
            )));
        }

        self.follows.delete_by_uri(&edge.uri).await?;
        info!(follow = %edge.uri, "Follow removed");
        Ok(())
    }

    async fn undo_like(
        &self,
        activity: &UndoActivity,
        signer: &remote_actor::Model,
    ) -> AppResult<()> {
        let Some(uri) = activity.inner_uri() else {
            return Err(AppError::Protocol("Undo Like without object id".to_string()));
        };
        let Some(row) = self.engagement.find_like_by_uri(uri.as_str()).await? else {
            debug!(like = %uri, "Undo Like for unknown row; ignoring");
            return Ok(());
        };

        if row.account_id != signer.id {
            return Err(AppError::AuthorizationDenied(format!(
                "Undo Like from {} for a like owned by another actor",
                signer.actor_uri
            )));
        }

        self.engagement.remove_like(row).await?;
        info!(like = %uri, "Like removed");
        Ok(())
    }

    async fn undo_announce(
        &self,
        activity: &UndoActivity,
        signer: &remote_actor::Model,
    ) -> AppResult<()> {
        let Some(uri) = activity.inner_uri() else {
            return Err(AppError::Protocol(
                "Undo Announce without object id".to_string(),
            ));
        };
        let Some(row) = self.engagement.find_boost_by_uri(uri.as_str()).await? else {
            debug!(boost = %uri, "Undo Announce for unknown row; ignoring");
            return Ok(());
        };

        if row.account_id != signer.id {
            return Err(AppError::AuthorizationDenied(format!(
                "Undo Announce from {} for a boost owned by another actor",
                signer.actor_uri
            )));
        }

        self.engagement.remove_boost(row).await?;
        info!(boost = %uri, "Boost removed");
        Ok(())
    }

    /// The Undo object was a bare URI; figure out what it referenced.
    async fn undo_by_uri(
        &self,
        activity: &UndoActivity,
        signer: &remote_actor::Model,
    ) -> AppResult<()> {
        let Some(uri) = activity.inner_uri() else {
            return Err(AppError::Protocol("Undo without object".to_string()));
        };

        if self.follows.find_by_uri(uri.as_str()).await?.is_some() {
            return self.undo_follow(activity, signer).await;
        }
        if self.engagement.find_like_by_uri(uri.as_str()).await?.is_some() {
            return self.undo_like(activity, signer).await;
        }
        if self.engagement.find_boost_by_uri(uri.as_str()).await?.is_some() {
            return self.undo_announce(activity, signer).await;
        }
        debug!(object = %uri, "Undo for unknown object; ignoring");
        Ok(())
    }
}
