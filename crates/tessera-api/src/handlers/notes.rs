//! Notes endpoints backing the client notes panel.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use tracing::info;

use tessera_core::{
    CreateNoteRequest, Discussion, Note, NoteableRef, NoteableType, NotesPollResponse, User,
};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::query_types::{CreateNoteBody, PollQuery, UpdateNoteBody};
use crate::state::AppState;

fn noteable_from_path(noteable_type: &str, noteable_id: i64) -> Result<NoteableRef, ApiError> {
    let noteable_type: NoteableType = noteable_type.parse()?;
    Ok(NoteableRef::new(noteable_type, noteable_id))
}

fn non_blank(note: &str) -> Result<(), ApiError> {
    if note.trim().is_empty() {
        return Err(ApiError::BadRequest("Note can't be blank".to_string()));
    }
    Ok(())
}

fn for_viewer(mut discussion: Discussion, viewer: &User) -> Discussion {
    for note in discussion.notes_mut() {
        note.current_user.can_edit = note.editable_by(viewer);
    }
    discussion
}

/// `GET /noteables/:type/:id/discussions`
pub async fn list_discussions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((noteable_type, noteable_id)): Path<(String, i64)>,
) -> Result<Json<Vec<Discussion>>, ApiError> {
    let noteable = noteable_from_path(&noteable_type, noteable_id)?;
    let discussions = state
        .notes
        .list_discussions(noteable)
        .await?
        .into_iter()
        .map(|d| for_viewer(d, &user))
        .collect();
    Ok(Json(discussions))
}

/// `GET /noteables/:type/:id/notes?last_fetched_at=`
///
/// The returned `last_fetched_at` is taken before querying, so a note written
/// while the query runs is delivered by the next poll at the latest.
pub async fn poll_notes(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((noteable_type, noteable_id)): Path<(String, i64)>,
    Query(query): Query<PollQuery>,
) -> Result<Json<NotesPollResponse>, ApiError> {
    let noteable = noteable_from_path(&noteable_type, noteable_id)?;
    let fetched_at = Utc::now().timestamp();
    let since = query
        .last_fetched_at
        .get()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or_default();

    let notes = state
        .notes
        .notes_since(noteable, since)
        .await?
        .into_iter()
        .map(|n| n.with_permissions(&user))
        .collect();

    Ok(Json(NotesPollResponse {
        notes,
        last_fetched_at: fetched_at,
    }))
}

/// `POST /noteables/:type/:id/notes`
pub async fn create_note(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((noteable_type, noteable_id)): Path<(String, i64)>,
    Json(body): Json<CreateNoteBody>,
) -> Result<impl IntoResponse, ApiError> {
    let noteable = noteable_from_path(&noteable_type, noteable_id)?;
    non_blank(&body.note)?;

    let note = state
        .notes
        .insert(CreateNoteRequest {
            noteable,
            author_id: user.id,
            note_html: state.markdown.render(&body.note),
            note: body.note,
            discussion_id: body.discussion_id,
        })
        .await?;

    info!(
        subsystem = "api",
        component = "notes",
        op = "create",
        note_id = note.id,
        noteable_id = noteable.noteable_id,
        user_id = user.id,
        "Note created"
    );

    let discussion = state
        .notes
        .find_discussion(noteable, &note.discussion_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Discussion {} not found", note.discussion_id)))?;

    Ok((StatusCode::CREATED, Json(for_viewer(discussion, &user))))
}

/// `PUT /notes/:id`
pub async fn update_note(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(note_id): Path<i64>,
    Json(body): Json<UpdateNoteBody>,
) -> Result<Json<Note>, ApiError> {
    let existing = state
        .notes
        .find(note_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Note {} not found", note_id)))?;

    if !existing.editable_by(&user) {
        return Err(ApiError::Forbidden(
            "Only the author can edit this note".to_string(),
        ));
    }
    non_blank(&body.note)?;

    let note_html = state.markdown.render(&body.note);
    let updated = state.notes.update(note_id, &body.note, &note_html).await?;

    info!(
        subsystem = "api",
        component = "notes",
        op = "update",
        note_id,
        user_id = user.id,
        "Note updated"
    );

    Ok(Json(updated.with_permissions(&user)))
}
