//! Render-ready snapshot of a notes panel.

use serde::Serialize;

use tessera_core::{Discussion, Note};

use crate::forms::{CommentForm, EditForm};
use crate::store::NotesStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteView {
    pub id: i64,
    pub author_name: String,
    pub author_username: String,
    pub note: String,
    pub note_html: String,
    pub can_edit: bool,
    /// Present while the note is being edited or saved.
    pub edit_form: Option<EditForm>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscussionView {
    pub id: String,
    pub individual: bool,
    pub notes: Vec<NoteView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelView {
    pub loading: bool,
    pub load_error: Option<String>,
    pub discussions: Vec<DiscussionView>,
    pub comment_form: CommentForm,
}

impl PanelView {
    pub fn from_store(store: &NotesStore) -> Self {
        Self {
            loading: store.is_loading(),
            load_error: store.load_error().map(str::to_string),
            discussions: store
                .discussions()
                .iter()
                .map(|d| discussion_view(store, d))
                .collect(),
            comment_form: CommentForm::from_store(store),
        }
    }

    pub fn notes(&self) -> impl Iterator<Item = &NoteView> {
        self.discussions.iter().flat_map(|d| d.notes.iter())
    }
}

fn discussion_view(store: &NotesStore, discussion: &Discussion) -> DiscussionView {
    DiscussionView {
        id: discussion.id().to_string(),
        individual: discussion.is_individual(),
        notes: discussion
            .notes()
            .iter()
            .map(|n| note_view(store, n))
            .collect(),
    }
}

fn note_view(store: &NotesStore, note: &Note) -> NoteView {
    NoteView {
        id: note.id,
        author_name: note.author.name.clone(),
        author_username: note.author.username.clone(),
        note: note.note.clone(),
        note_html: note.note_html.clone(),
        can_edit: note.current_user.can_edit,
        edit_form: EditForm::from_store(store, note.id),
    }
}
