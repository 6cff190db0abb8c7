//! Local actor document endpoint.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::debug;

use super::{ACTIVITY_CONTENT_TYPE, FederationState};
use crate::objects::ACTIVITYSTREAMS_CONTEXT;

/// `GET /users/{username}` — the actor's JSON-LD Person document,
/// including the public key peers verify our signatures with.
pub async fn actor_handler(
    State(state): State<FederationState>,
    Path(username): Path<String>,
) -> Response {
    let account = match state.accounts.find_by_username(&username).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            debug!(username, "Actor not found");
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(err) => return err.into_response(),
    };

    let actor_uri = state.outbox.actor_uri(&account.username);
    let document = json!({
        "@context": [
            ACTIVITYSTREAMS_CONTEXT,
            "https://w3id.org/security/v1",
        ],
        "id": actor_uri,
        "type": "Person",
        "preferredUsername": account.username,
        "name": account.display_name,
        "summary": account.summary,
        "inbox": format!("{actor_uri}/inbox"),
        "outbox": format!("{actor_uri}/outbox"),
        "followers": format!("{actor_uri}/followers"),
        "following": format!("{actor_uri}/following"),
        "publicKey": {
            "id": format!("{actor_uri}#main-key"),
            "owner": actor_uri,
            "publicKeyPem": account.public_key_pem,
        },
        "endpoints": {
            "sharedInbox": format!("https://{}/inbox", state.config.local_domain),
        },
    });

    (
        StatusCode::OK,
        [("Content-Type", ACTIVITY_CONTENT_TYPE)],
        Json(document),
    )
        .into_response()
}
