//! View-models for the new-note and edit-note forms.

use serde::Serialize;

use tessera_core::defaults::{
    COMMENT_PLACEHOLDER, MARKDOWN_EDIT_LINK_LABEL, MARKDOWN_LINK_LABEL, QUICK_ACTIONS_LINK_LABEL,
};

use crate::store::{NoteState, NotesStore};

/// A help link shown under a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocLink {
    pub label: String,
    pub href: String,
}

impl DocLink {
    fn new(label: &str, href: &str) -> Self {
        Self {
            label: label.to_string(),
            href: href.to_string(),
        }
    }
}

/// Form for adding a new note at the bottom of the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentForm {
    pub placeholder: String,
    pub draft: String,
    pub submit_enabled: bool,
    pub submitting: bool,
    pub markdown_link: DocLink,
    pub quick_actions_link: Option<DocLink>,
    pub error: Option<String>,
}

impl CommentForm {
    /// Rendered regardless of whether discussions are still loading.
    pub fn from_store(store: &NotesStore) -> Self {
        let data = store.notes_data();
        let draft = store.comment_draft().to_string();
        let submit_enabled = store.user().can_create_note
            && !store.comment_submitting()
            && !draft.trim().is_empty();

        Self {
            placeholder: COMMENT_PLACEHOLDER.to_string(),
            draft,
            submit_enabled,
            submitting: store.comment_submitting(),
            markdown_link: DocLink::new(MARKDOWN_LINK_LABEL, &data.markdown_docs_path),
            quick_actions_link: data
                .quick_actions_docs_path
                .as_deref()
                .map(|href| DocLink::new(QUICK_ACTIONS_LINK_LABEL, href)),
            error: store.comment_error().map(str::to_string),
        }
    }
}

/// Inline form replacing a note body while it is edited.
///
/// Carries no quick-actions link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditForm {
    pub note_id: i64,
    pub draft: String,
    pub save_enabled: bool,
    pub saving: bool,
    pub markdown_link: DocLink,
    pub error: Option<String>,
}

impl EditForm {
    /// `None` unless the note is being edited or saved.
    pub fn from_store(store: &NotesStore, note_id: i64) -> Option<Self> {
        let state = store.note_state(note_id)?;
        let draft = state.draft()?.to_string();
        let saving = matches!(state, NoteState::Saving { .. });

        Some(Self {
            note_id,
            save_enabled: !saving && !draft.trim().is_empty(),
            draft,
            saving,
            markdown_link: DocLink::new(
                MARKDOWN_EDIT_LINK_LABEL,
                &store.notes_data().markdown_docs_path,
            ),
            error: store.edit_error(note_id).map(str::to_string),
        })
    }
}
