//! Standalone note object endpoint.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use starling_db::entities::note::Visibility;

use super::{ACTIVITY_CONTENT_TYPE, FederationState};

/// `GET /notes/{id}` — the Note object. Only public and unlisted notes
/// are served; anything else is indistinguishable from absent.
pub async fn note_handler(
    State(state): State<FederationState>,
    Path(id): Path<String>,
) -> Response {
    let note = match state.notes.find_by_id(&id).await {
        Ok(Some(note)) => note,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => return err.into_response(),
    };

    if !matches!(note.visibility, Visibility::Public | Visibility::Unlisted) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let author = match state.accounts.find_by_id(&note.author_id).await {
        Ok(Some(author)) => author,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => return err.into_response(),
    };

    match state.outbox.note_object_for_display(&author, &note).await {
        Ok(mut object) => {
            object["@context"] = serde_json::json!(crate::objects::ACTIVITYSTREAMS_CONTEXT);
            (
                StatusCode::OK,
                [("Content-Type", ACTIVITY_CONTENT_TYPE)],
                Json(object),
            )
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}
