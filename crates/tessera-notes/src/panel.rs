//! Notes panel: discussions of one noteable plus per-note edit state.
//!
//! All mutation goes through `&mut NotesPanel` between awaits, so the panel
//! needs no locking. Each remote call (load, update, create, poll) is an
//! independent future; [`NotesPanel::begin_save`] and
//! [`NotesPanel::complete_save`] let callers drive several note updates at
//! once without holding the panel across the request.

use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info, warn};

use tessera_core::{Discussion, Error, Note, Result};

use crate::forms::{CommentForm, EditForm};
use crate::service::{NotesEndpoints, NotesService};
use crate::store::{NoteState, NotesStore};
use crate::view::PanelView;

/// An update that has left the panel and awaits its acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpdate {
    pub note_id: i64,
    pub content: String,
    pub seq: u64,
}

pub struct NotesPanel<S: NotesService> {
    store: NotesStore,
    service: S,
    endpoints: NotesEndpoints,
}

impl<S: NotesService> NotesPanel<S> {
    pub fn new(store: NotesStore, service: S) -> Self {
        let endpoints = NotesEndpoints::from(store.notes_data());
        Self {
            store,
            service,
            endpoints,
        }
    }

    pub fn store(&self) -> &NotesStore {
        &self.store
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Fetch the discussions. On failure the panel leaves the loading state
    /// with the error message recorded.
    ///
    /// Without a seeded `last_fetched_at`, the poll cursor starts just below
    /// the newest loaded note, so the first poll only returns later changes.
    pub async fn load(&mut self) -> Result<()> {
        let start = Instant::now();
        match self.service.fetch_discussions(&self.endpoints).await {
            Ok(discussions) => {
                let result_count = discussions.len();
                let synced_through = discussions
                    .iter()
                    .flat_map(|d| d.notes())
                    .map(|n| n.updated_at.timestamp())
                    .max();
                self.store.set_discussions(discussions);
                if self.store.last_fetched_at().is_none() {
                    // One second back so notes written in the same second are still polled
                    if let Some(ts) = synced_through {
                        self.store.set_last_fetched_at(ts - 1);
                    }
                }
                info!(
                    subsystem = "notes",
                    component = "panel",
                    op = "load",
                    noteable_id = self.store.noteable().id,
                    result_count,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Discussions loaded"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    subsystem = "notes",
                    component = "panel",
                    op = "load",
                    noteable_id = self.store.noteable().id,
                    error = %e,
                    "Failed to load discussions"
                );
                self.store.set_load_error(e.to_string());
                Err(e)
            }
        }
    }

    pub fn discussions(&self) -> &[Discussion] {
        self.store.discussions()
    }

    pub fn note_state(&self, note_id: i64) -> Option<&NoteState> {
        self.store.note_state(note_id)
    }

    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    /// Open the edit form of one note, seeded with its current content.
    /// Already editing is a no-op.
    pub fn start_edit(&mut self, note_id: i64) -> Result<()> {
        let note = self
            .store
            .find_note(note_id)
            .ok_or(Error::NoteNotFound(note_id))?;
        if !note.current_user.can_edit {
            return Err(Error::Forbidden(format!("note {} is not editable", note_id)));
        }
        let draft = note.note.clone();

        match self.current_state(note_id)? {
            NoteState::Display => {
                self.transition(note_id, "start_edit", NoteState::Editing { draft });
                Ok(())
            }
            NoteState::Editing { .. } => Ok(()),
            NoteState::Saving { .. } => Err(saving_conflict(note_id)),
        }
    }

    pub fn update_draft(&mut self, note_id: i64, text: impl Into<String>) -> Result<()> {
        match self.current_state(note_id)? {
            NoteState::Editing { .. } => {
                self.store
                    .set_note_state(note_id, NoteState::Editing { draft: text.into() });
                Ok(())
            }
            NoteState::Saving { .. } => Err(saving_conflict(note_id)),
            NoteState::Display => Err(not_editing(note_id)),
        }
    }

    /// Discard the draft and return to display.
    pub fn cancel_edit(&mut self, note_id: i64) -> Result<()> {
        match self.current_state(note_id)? {
            NoteState::Editing { .. } => {
                self.store.set_edit_error(note_id, None);
                self.transition(note_id, "cancel_edit", NoteState::Display);
                Ok(())
            }
            NoteState::Display => Ok(()),
            NoteState::Saving { .. } => Err(saving_conflict(note_id)),
        }
    }

    /// Move a note from editing to saving and hand out the update to send.
    pub fn begin_save(&mut self, note_id: i64) -> Result<PendingUpdate> {
        let draft = match self.current_state(note_id)? {
            NoteState::Editing { draft } => draft,
            NoteState::Saving { .. } => return Err(saving_conflict(note_id)),
            NoteState::Display => return Err(not_editing(note_id)),
        };
        if draft.trim().is_empty() {
            return Err(Error::InvalidInput("Note can't be blank".to_string()));
        }

        let seq = self.store.next_seq();
        self.store.set_edit_error(note_id, None);
        self.transition(
            note_id,
            "begin_save",
            NoteState::Saving {
                draft: draft.clone(),
                seq,
            },
        );
        Ok(PendingUpdate {
            note_id,
            content: draft,
            seq,
        })
    }

    /// Apply the acknowledgment of `pending`. Acknowledgments for an update
    /// that is no longer the note's current save are ignored.
    pub fn complete_save(&mut self, pending: PendingUpdate, result: Result<Note>) -> Result<()> {
        let current = matches!(
            self.store.note_state(pending.note_id),
            Some(NoteState::Saving { seq, .. }) if *seq == pending.seq
        );
        if !current {
            debug!(
                subsystem = "notes",
                component = "panel",
                op = "complete_save",
                note_id = pending.note_id,
                seq = pending.seq,
                "Ignoring stale acknowledgment"
            );
            return Ok(());
        }

        match result {
            Ok(note) => {
                self.store.upsert_note(note);
                self.transition(pending.note_id, "complete_save", NoteState::Display);
                info!(
                    subsystem = "notes",
                    component = "panel",
                    op = "update_note",
                    note_id = pending.note_id,
                    "Note saved"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    subsystem = "notes",
                    component = "panel",
                    op = "update_note",
                    note_id = pending.note_id,
                    error = %e,
                    "Note update failed"
                );
                self.store
                    .set_edit_error(pending.note_id, Some(e.to_string()));
                self.transition(
                    pending.note_id,
                    "complete_save",
                    NoteState::Editing {
                        draft: pending.content,
                    },
                );
                Err(e)
            }
        }
    }

    /// Save one note and wait for its acknowledgment.
    pub async fn save(&mut self, note_id: i64) -> Result<()> {
        let pending = self.begin_save(note_id)?;
        let result = self
            .service
            .update_note(pending.note_id, &pending.content)
            .await;
        self.complete_save(pending, result)
    }

    /// Save several notes concurrently. Outcomes are in `note_ids` order.
    pub async fn save_all(&mut self, note_ids: &[i64]) -> Vec<Result<()>> {
        let mut outcomes = Vec::with_capacity(note_ids.len());
        let mut pending = Vec::new();
        for &note_id in note_ids {
            match self.begin_save(note_id) {
                Ok(update) => {
                    pending.push((outcomes.len(), update));
                    outcomes.push(Ok(()));
                }
                Err(e) => outcomes.push(Err(e)),
            }
        }

        let service = &self.service;
        let acks = join_all(
            pending
                .iter()
                .map(|(_, update)| service.update_note(update.note_id, &update.content)),
        )
        .await;

        for ((slot, update), ack) in pending.into_iter().zip(acks) {
            outcomes[slot] = self.complete_save(update, ack);
        }
        outcomes
    }

    pub fn comment_form(&self) -> CommentForm {
        CommentForm::from_store(&self.store)
    }

    pub fn edit_form(&self, note_id: i64) -> Option<EditForm> {
        EditForm::from_store(&self.store, note_id)
    }

    pub fn update_comment_draft(&mut self, text: impl Into<String>) {
        self.store.set_comment_draft(text.into());
    }

    /// Create a note from the comment draft. The draft is cleared on success
    /// and kept on failure.
    pub async fn submit_comment(&mut self) -> Result<()> {
        if !self.store.user().can_create_note {
            return Err(Error::Forbidden("cannot create notes here".to_string()));
        }
        if self.store.comment_submitting() {
            return Err(Error::Conflict("comment already submitting".to_string()));
        }
        let content = self.store.comment_draft().to_string();
        if content.trim().is_empty() {
            return Err(Error::InvalidInput("Note can't be blank".to_string()));
        }

        self.store.set_comment_submitting(true);
        self.store.set_comment_error(None);
        let result = self
            .service
            .create_note(&self.endpoints, &content, None)
            .await;
        self.store.set_comment_submitting(false);

        match result {
            Ok(discussion) => {
                info!(
                    subsystem = "notes",
                    component = "panel",
                    op = "create_note",
                    noteable_id = self.store.noteable().id,
                    discussion_id = discussion.id(),
                    "Note created"
                );
                self.store.merge_discussion(discussion);
                self.store.set_comment_draft(String::new());
                Ok(())
            }
            Err(e) => {
                warn!(
                    subsystem = "notes",
                    component = "panel",
                    op = "create_note",
                    error = %e,
                    "Note creation failed"
                );
                self.store.set_comment_error(Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Merge notes changed since the last sync. Server content replaces the
    /// local copy whenever it is at least as recent, whatever the note's edit
    /// state: drafts and in-flight saves are kept in the note state and are
    /// untouched. Returns how many notes were merged.
    pub async fn poll(&mut self) -> Result<usize> {
        let response = self
            .service
            .poll(&self.endpoints, self.store.last_fetched_at())
            .await?;

        let mut merged = 0;
        for note in response.notes {
            let outdated = self
                .store
                .find_note(note.id)
                .is_some_and(|local| local.updated_at > note.updated_at);
            if outdated {
                debug!(
                    subsystem = "notes",
                    component = "panel",
                    op = "poll",
                    note_id = note.id,
                    "Ignoring note older than local copy"
                );
                continue;
            }
            self.store.upsert_note(note);
            merged += 1;
        }
        self.store.set_last_fetched_at(response.last_fetched_at);

        debug!(
            subsystem = "notes",
            component = "panel",
            op = "poll",
            result_count = merged,
            last_fetched_at = response.last_fetched_at,
            "Poll merged"
        );
        Ok(merged)
    }

    /// Snapshot of everything the panel displays.
    pub fn render(&self) -> PanelView {
        PanelView::from_store(&self.store)
    }

    fn current_state(&self, note_id: i64) -> Result<NoteState> {
        self.store
            .note_state(note_id)
            .cloned()
            .ok_or(Error::NoteNotFound(note_id))
    }

    fn transition(&mut self, note_id: i64, op: &str, state: NoteState) {
        debug!(
            subsystem = "notes",
            component = "panel",
            op,
            note_id,
            state = ?state,
            "Note state transition"
        );
        self.store.set_note_state(note_id, state);
    }
}

fn saving_conflict(note_id: i64) -> Error {
    Error::Conflict(format!("note {} is being saved", note_id))
}

fn not_editing(note_id: i64) -> Error {
    Error::InvalidInput(format!("note {} is not being edited", note_id))
}
