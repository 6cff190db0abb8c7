//! Inbox endpoints.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::FederationState;

/// `POST /inbox` — the shared inbox. Local recipients are derived from
/// the activity itself.
pub async fn shared_inbox_handler(
    State(state): State<FederationState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    run_inbox(&state, "/inbox", &headers, &body, None).await
}

/// `POST /users/{username}/inbox` — a per-user inbox.
pub async fn user_inbox_handler(
    State(state): State<FederationState>,
    Path(username): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = format!("/users/{username}/inbox");
    run_inbox(&state, &path, &headers, &body, Some(&username)).await
}

async fn run_inbox(
    state: &FederationState,
    path: &str,
    headers: &HeaderMap,
    body: &Bytes,
    target: Option<&str>,
) -> Response {
    let header_map = lowercase_headers(headers);

    match state.inbox.handle(path, &header_map, body, target).await {
        Ok(_) => StatusCode::ACCEPTED.into_response(),
        Err(err) => {
            warn!(path, error = %err, "Inbox request rejected");
            err.into_response()
        }
    }
}

fn lowercase_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect()
}
