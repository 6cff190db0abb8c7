//! Incoming Update processing.

use starling_common::{AppError, AppResult};
use starling_db::entities::remote_actor;
use starling_db::repositories::ActivityRepository;
use tracing::{debug, info};

use crate::UpdateActivity;
use crate::resolver::ActorResolver;

/// Processor for incoming Update activities.
///
/// `Update{Person}` force-refreshes the actor cache. Any other Update is
/// an edit: the cached Create's payload is replaced, or — when the
/// original never arrived (late follow) — the Update's own row is
/// converted into a Create so the content is reachable.
#[derive(Clone)]
pub struct UpdateProcessor {
    activities: ActivityRepository,
    resolver: ActorResolver,
}

impl UpdateProcessor {
    #[must_use]
    pub const fn new(activities: ActivityRepository, resolver: ActorResolver) -> Self {
        Self {
            activities,
            resolver,
        }
    }

    pub async fn process(
        &self,
        activity: &UpdateActivity,
        signer: &remote_actor::Model,
        activity_row_id: &str,
    ) -> AppResult<()> {
        let Some(object_uri) = activity.object_uri() else {
            return Err(AppError::Protocol("Update without object id".to_string()));
        };

        if activity.object_kind() == Some("Person") {
            // Only an actor may update its own profile.
            if object_uri.as_str() != signer.actor_uri {
                return Err(AppError::AuthorizationDenied(format!(
                    "Update Person from {} for {object_uri}",
                    signer.actor_uri
                )));
            }
            self.resolver.force_refresh(object_uri.as_str()).await?;
            info!(actor = %object_uri, "Actor profile refreshed");
            return Ok(());
        }

        match self
            .activities
            .find_create_by_object_uri(object_uri.as_str())
            .await?
        {
            Some(original) => {
                if original.actor_uri != signer.actor_uri {
                    return Err(AppError::AuthorizationDenied(format!(
                        "Update from {} for content by {}",
                        signer.actor_uri, original.actor_uri
                    )));
                }
                self.activities
                    .replace_raw_json(&original.id, activity.object.clone())
                    .await?;
                info!(object = %object_uri, "Edit applied");
            }
            None => {
                // Late follow: we never saw the Create; store the edited
                // object as one.
                debug!(object = %object_uri, "Update without original; storing as Create");
                self.activities
                    .convert_to_create(
                        activity_row_id,
                        object_uri.to_string(),
                        activity.object.clone(),
                        false,
                    )
                    .await?;
            }
        }
        Ok(())
    }
}
