//! Incoming Like processing.

use chrono::Utc;
use starling_common::{AppError, AppResult};
use starling_db::entities::remote_actor;
use starling_db::entities::notification::NotificationKind;
use starling_db::repositories::{EngagementRepository, EngagementTarget, NoteRepository};
use tracing::{debug, info};

use crate::LikeActivity;
use crate::notify::{Notifier, NotifyActor, NotifyNote};

/// Processor for incoming Like activities targeting local notes.
#[derive(Clone)]
pub struct LikeProcessor {
    notes: NoteRepository,
    engagement: EngagementRepository,
    notifier: Notifier,
}

impl LikeProcessor {
    #[must_use]
    pub const fn new(
        notes: NoteRepository,
        engagement: EngagementRepository,
        notifier: Notifier,
    ) -> Self {
        Self {
            notes,
            engagement,
            notifier,
        }
    }

    pub async fn process(
        &self,
        activity: &LikeActivity,
        signer: &remote_actor::Model,
    ) -> AppResult<()> {
        let object_uri = activity
            .object
            .uri()
            .ok_or_else(|| AppError::Protocol("Like without object".to_string()))?;

        let Some(note) = self.notes.find_by_uri(object_uri.as_str()).await? else {
            debug!(object = %object_uri, "Like for unknown note; ignoring");
            return Ok(());
        };

        let inserted = self
            .engagement
            .add_like(
                &signer.id,
                &EngagementTarget::Note(note.id.clone()),
                activity.id.as_str(),
                Utc::now(),
            )
            .await?;

        if inserted {
            info!(note = %note.id, actor = %signer.actor_uri, "Note liked");
            self.notifier
                .notify(
                    &note.author_id,
                    NotificationKind::Like,
                    &NotifyActor::from(signer),
                    NotifyNote::local(&note.id, &note.object_uri, &note.body),
                )
                .await?;
        } else {
            debug!(note = %note.id, "Duplicate like; ignoring");
        }
        Ok(())
    }
}
