//! `ActivityPub` collection endpoints (outbox, followers, following).

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use starling_db::entities::account;

use super::{ACTIVITY_CONTENT_TYPE, FederationState};
use crate::objects::ACTIVITYSTREAMS_CONTEXT;

/// Notes per outbox page.
const PAGE_SIZE: u64 = 20;

/// Query parameters for paginated collections.
#[derive(Debug, Deserialize)]
pub struct CollectionQuery {
    pub page: Option<u64>,
}

/// `GET /users/{username}/outbox?page=N` — the user's public notes as
/// Create activities, 20 per page. Without `page`, the collection
/// envelope with `totalItems` and `first`.
pub async fn outbox_handler(
    State(state): State<FederationState>,
    Path(username): Path<String>,
    Query(query): Query<CollectionQuery>,
) -> Response {
    let account = match find_account(&state, &username).await {
        Ok(account) => account,
        Err(response) => return response,
    };

    // Muted accounts are excluded from public listings.
    if account.muted {
        return StatusCode::NOT_FOUND.into_response();
    }

    let collection_uri = format!("{}/outbox", state.outbox.actor_uri(&account.username));
    let total = match state.notes.count_public_by_author(&account.id).await {
        Ok(total) => total,
        Err(err) => return err.into_response(),
    };

    let Some(page) = query.page else {
        let document = json!({
            "@context": ACTIVITYSTREAMS_CONTEXT,
            "id": collection_uri,
            "type": "OrderedCollection",
            "totalItems": total,
            "first": format!("{collection_uri}?page=1"),
        });
        return activity_json(document);
    };

    let page = page.max(1);
    let offset = (page - 1) * PAGE_SIZE;
    let notes = match state
        .notes
        .find_public_by_author(&account.id, PAGE_SIZE, offset)
        .await
    {
        Ok(notes) => notes,
        Err(err) => return err.into_response(),
    };

    let mut items = Vec::with_capacity(notes.len());
    for note in &notes {
        match state.outbox.note_object_for_display(&account, note).await {
            Ok(object) => items.push(state.outbox.wrap_in_create(&account, note, object)),
            Err(err) => return err.into_response(),
        }
    }

    let mut document = json!({
        "@context": ACTIVITYSTREAMS_CONTEXT,
        "id": format!("{collection_uri}?page={page}"),
        "type": "OrderedCollectionPage",
        "partOf": collection_uri,
        "totalItems": total,
        "orderedItems": items,
    });
    if offset + PAGE_SIZE < total {
        document["next"] = json!(format!("{collection_uri}?page={}", page + 1));
    }
    activity_json(document)
}

/// `GET /users/{username}/followers`
pub async fn followers_handler(
    State(state): State<FederationState>,
    Path(username): Path<String>,
    Query(query): Query<CollectionQuery>,
) -> Response {
    let account = match find_account(&state, &username).await {
        Ok(account) => account,
        Err(response) => return response,
    };

    let edges = match state.follows.followers_of(&account.id).await {
        Ok(edges) => edges,
        Err(err) => return err.into_response(),
    };
    let ids: Vec<String> = edges.into_iter().map(|e| e.follower_id).collect();
    serve_actor_collection(
        &state,
        format!("{}/followers", state.outbox.actor_uri(&account.username)),
        &ids,
        query.page,
    )
    .await
}

/// `GET /users/{username}/following`
pub async fn following_handler(
    State(state): State<FederationState>,
    Path(username): Path<String>,
    Query(query): Query<CollectionQuery>,
) -> Response {
    let account = match find_account(&state, &username).await {
        Ok(account) => account,
        Err(response) => return response,
    };

    let edges = match state.follows.following_of(&account.id).await {
        Ok(edges) => edges,
        Err(err) => return err.into_response(),
    };
    let ids: Vec<String> = edges.into_iter().map(|e| e.target_id).collect();
    serve_actor_collection(
        &state,
        format!("{}/following", state.outbox.actor_uri(&account.username)),
        &ids,
        query.page,
    )
    .await
}

async fn find_account(
    state: &FederationState,
    username: &str,
) -> Result<account::Model, Response> {
    match state.accounts.find_by_username(username).await {
        Ok(Some(account)) => Ok(account),
        Ok(None) => Err(StatusCode::NOT_FOUND.into_response()),
        Err(err) => Err(err.into_response()),
    }
}

/// Map follow-edge endpoint ids to actor URIs: cached remote actors and
/// local accounts both appear in collections.
async fn actor_uris_for_ids(state: &FederationState, ids: &[String]) -> Result<Vec<String>, Response> {
    let remote = match state.remote_actors.find_by_ids(ids).await {
        Ok(actors) => actors,
        Err(err) => return Err(err.into_response()),
    };
    let mut uris = Vec::with_capacity(ids.len());
    let remote_ids: Vec<&str> = remote.iter().map(|a| a.id.as_str()).collect();
    for actor in &remote {
        uris.push(actor.actor_uri.clone());
    }
    for id in ids {
        if remote_ids.contains(&id.as_str()) {
            continue;
        }
        match state.accounts.find_by_id(id).await {
            Ok(Some(local)) => uris.push(state.outbox.actor_uri(&local.username)),
            Ok(None) => {}
            Err(err) => return Err(err.into_response()),
        }
    }
    Ok(uris)
}

async fn serve_actor_collection(
    state: &FederationState,
    collection_uri: String,
    ids: &[String],
    page: Option<u64>,
) -> Response {
    let total = ids.len() as u64;

    let Some(page) = page else {
        let document = json!({
            "@context": ACTIVITYSTREAMS_CONTEXT,
            "id": collection_uri,
            "type": "OrderedCollection",
            "totalItems": total,
            "first": format!("{collection_uri}?page=1"),
        });
        return activity_json(document);
    };

    let page = page.max(1);
    let offset = ((page - 1) * PAGE_SIZE) as usize;
    let slice: Vec<String> = ids.iter().skip(offset).take(PAGE_SIZE as usize).cloned().collect();
    let uris = match actor_uris_for_ids(state, &slice).await {
        Ok(uris) => uris,
        Err(response) => return response,
    };

    let mut document = json!({
        "@context": ACTIVITYSTREAMS_CONTEXT,
        "id": format!("{collection_uri}?page={page}"),
        "type": "OrderedCollectionPage",
        "partOf": collection_uri,
        "totalItems": total,
        "orderedItems": uris,
    });
    if offset + (PAGE_SIZE as usize) < total as usize {
        document["next"] = json!(format!("{collection_uri}?page={}", page + 1));
    }
    activity_json(document)
}

fn activity_json(document: Value) -> Response {
    (
        StatusCode::OK,
        [("Content-Type", ACTIVITY_CONTENT_TYPE)],
        Json(document),
    )
        .into_response()
}
