//! Incoming Delete processing.

use starling_common::{AppError, AppResult};
use starling_db::entities::remote_actor;
use starling_db::repositories::{ActivityRepository, RemoteActorRepository};
use tracing::{debug, info};

use crate::DeleteActivity;

/// Processor for incoming Delete activities.
///
/// A self-delete (`object == actor`) cascades the remote actor and its
/// follow edges. An object delete removes the cached content, but only
/// when the signer authored it.
#[derive(Clone)]
pub struct DeleteProcessor {
    remote_actors: RemoteActorRepository,
    activities: ActivityRepository,
}

impl DeleteProcessor {
    #[must_use]
    pub const fn new(
        remote_actors: RemoteActorRepository,
        activities: ActivityRepository,
    ) -> Self {
        Self {
            remote_actors,
            activities,
        }
    }

    pub async fn process(
        &self,
        activity: &DeleteActivity,
        signer: &remote_actor::Model,
    ) -> AppResult<()> {
        if activity.is_self_delete() {
            // The signature already proves the actor is deleting itself.
            self.remote_actors.delete_cascade(&signer.id).await?;
            info!(actor = %signer.actor_uri, "Remote actor deleted");
            return Ok(());
        }

        let Some(object_uri) = activity.object.uri() else {
            return Err(AppError::Protocol("Delete without object".to_string()));
        };

        let Some(cached) = self
            .activities
            .find_create_by_object_uri(object_uri.as_str())
            .await?
        else {
            debug!(object = %object_uri, "Delete for unknown object; ignoring");
            return Ok(());
        };

        if cached.actor_uri != signer.actor_uri {
            return Err(AppError::AuthorizationDenied(format!(
                "Delete from {} for content by {}",
                signer.actor_uri, cached.actor_uri
            )));
        }

        self.activities.delete(&cached.id).await?;
        info!(object = %object_uri, "Cached content deleted");
        Ok(())
    }
}
