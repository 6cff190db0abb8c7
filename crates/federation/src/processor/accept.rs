//! Incoming Accept processing.

use starling_common::{AppError, AppResult};
use starling_db::entities::remote_actor;
use starling_db::repositories::FollowRepository;
use tracing::{debug, info};
use url::Url;

use crate::AcceptActivity;
use crate::relay::RelayController;

/// Processor for incoming Accept activities: relay subscriptions go
/// `pending -> active`, outgoing follows flip `accepted = true`.
#[derive(Clone)]
pub struct AcceptProcessor {
    follows: FollowRepository,
    relays: RelayController,
}

impl AcceptProcessor {
    #[must_use]
    pub const fn new(follows: FollowRepository, relays: RelayController) -> Self {
        Self { follows, relays }
    }

    pub async fn process(
        &self,
        activity: &AcceptActivity,
        signer: &remote_actor::Model,
    ) -> AppResult<()> {
        let signer_url = Url::parse(&signer.actor_uri)
            .map_err(|e| AppError::Protocol(format!("bad signer URI: {e}")))?;

        if self.relays.accept_from_relay(&signer_url).await? {
            return Ok(());
        }

        let Some(follow_uri) = activity.object.uri() else {
            return Err(AppError::Protocol("Accept without object".to_string()));
        };

        let Some(edge) = self.follows.find_by_uri(follow_uri.as_str()).await? else {
            debug!(follow = %follow_uri, "Accept for unknown follow; ignoring");
            return Ok(());
        };

        // Only the followed actor may accept the follow.
        if edge.target_id != signer.id {
            return Err(AppError::AuthorizationDenied(format!(
                "Accept from {} for a follow of another actor",
                signer.actor_uri
            )));
        }

        if self.follows.accept_by_uri(follow_uri.as_str()).await? {
            info!(follow = %follow_uri, "Outgoing follow accepted");
        } else {
            debug!(follow = %follow_uri, "Duplicate Accept; ignoring");
        }
        Ok(())
    }
}
