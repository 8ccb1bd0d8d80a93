//! Explicit state owned by a [`crate::NotesPanel`].

use std::collections::HashMap;

use tessera_core::{Discussion, Note, NoteableData, NotesData, UserData};

/// Per-note edit lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NoteState {
    #[default]
    Display,
    Editing {
        draft: String,
    },
    /// An update carrying `draft` is in flight; `seq` identifies it.
    Saving {
        draft: String,
        seq: u64,
    },
}

impl NoteState {
    pub fn draft(&self) -> Option<&str> {
        match self {
            NoteState::Display => None,
            NoteState::Editing { draft } | NoteState::Saving { draft, .. } => Some(draft),
        }
    }

    pub fn is_display(&self) -> bool {
        matches!(self, NoteState::Display)
    }

    pub fn is_editing(&self) -> bool {
        matches!(self, NoteState::Editing { .. })
    }

    pub fn is_saving(&self) -> bool {
        matches!(self, NoteState::Saving { .. })
    }
}

/// Everything the panel knows: the noteable and viewer it was mounted with,
/// the discussions fetched so far, and the transient form state.
#[derive(Debug, Clone)]
pub struct NotesStore {
    noteable: NoteableData,
    notes_data: NotesData,
    user: UserData,
    discussions: Vec<Discussion>,
    note_states: HashMap<i64, NoteState>,
    edit_errors: HashMap<i64, String>,
    loading: bool,
    load_error: Option<String>,
    last_fetched_at: Option<i64>,
    comment_draft: String,
    comment_submitting: bool,
    comment_error: Option<String>,
    next_seq: u64,
}

impl NotesStore {
    /// A store in the loading state with no discussions yet.
    pub fn new(noteable: NoteableData, notes_data: NotesData, user: UserData) -> Self {
        let last_fetched_at = notes_data.last_fetched_at;
        Self {
            noteable,
            notes_data,
            user,
            discussions: Vec::new(),
            note_states: HashMap::new(),
            edit_errors: HashMap::new(),
            loading: true,
            load_error: None,
            last_fetched_at,
            comment_draft: String::new(),
            comment_submitting: false,
            comment_error: None,
            next_seq: 0,
        }
    }

    pub fn noteable(&self) -> &NoteableData {
        &self.noteable
    }

    pub fn notes_data(&self) -> &NotesData {
        &self.notes_data
    }

    pub fn user(&self) -> &UserData {
        &self.user
    }

    pub fn discussions(&self) -> &[Discussion] {
        &self.discussions
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn last_fetched_at(&self) -> Option<i64> {
        self.last_fetched_at
    }

    pub fn comment_draft(&self) -> &str {
        &self.comment_draft
    }

    pub fn comment_submitting(&self) -> bool {
        self.comment_submitting
    }

    pub fn comment_error(&self) -> Option<&str> {
        self.comment_error.as_deref()
    }

    /// State of a note; `None` for notes the store has never seen.
    pub fn note_state(&self, note_id: i64) -> Option<&NoteState> {
        self.note_states.get(&note_id)
    }

    pub fn edit_error(&self, note_id: i64) -> Option<&str> {
        self.edit_errors.get(&note_id).map(String::as_str)
    }

    pub fn find_note(&self, note_id: i64) -> Option<&Note> {
        self.discussions.iter().find_map(|d| d.find_note(note_id))
    }

    pub fn note_count(&self) -> usize {
        self.discussions.iter().map(|d| d.notes().len()).sum()
    }

    /// Replace all discussions with a fresh listing and leave the loading
    /// state. States of notes that are still present are kept.
    pub(crate) fn set_discussions(&mut self, discussions: Vec<Discussion>) {
        self.discussions = discussions;
        let ids: Vec<i64> = self.note_ids().collect();
        self.note_states.retain(|id, _| ids.contains(id));
        self.edit_errors.retain(|id, _| ids.contains(id));
        for id in ids {
            self.note_states.entry(id).or_default();
        }
        self.loading = false;
        self.load_error = None;
    }

    pub(crate) fn set_load_error(&mut self, message: String) {
        self.loading = false;
        self.load_error = Some(message);
    }

    pub(crate) fn set_last_fetched_at(&mut self, last_fetched_at: i64) {
        self.last_fetched_at = Some(last_fetched_at);
    }

    /// Insert or replace `note` in its discussion, appending a new discussion
    /// when none matches.
    pub(crate) fn upsert_note(&mut self, note: Note) {
        let id = note.id;
        match self
            .discussions
            .iter_mut()
            .find(|d| d.id() == note.discussion_id)
        {
            Some(discussion) => discussion.upsert_note(note),
            None => self.discussions.extend(Discussion::group(vec![note])),
        }
        self.note_states.entry(id).or_default();
    }

    /// Merge a discussion returned by the server into the list.
    pub(crate) fn merge_discussion(&mut self, discussion: Discussion) {
        let ids: Vec<i64> = discussion.notes().iter().map(|n| n.id).collect();
        match self
            .discussions
            .iter_mut()
            .find(|d| d.id() == discussion.id())
        {
            Some(existing) => {
                for note in discussion.notes() {
                    existing.upsert_note(note.clone());
                }
            }
            None => self.discussions.push(discussion),
        }
        for id in ids {
            self.note_states.entry(id).or_default();
        }
    }

    pub(crate) fn set_note_state(&mut self, note_id: i64, state: NoteState) {
        self.note_states.insert(note_id, state);
    }

    pub(crate) fn set_edit_error(&mut self, note_id: i64, message: Option<String>) {
        match message {
            Some(message) => self.edit_errors.insert(note_id, message),
            None => self.edit_errors.remove(&note_id),
        };
    }

    pub(crate) fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    pub(crate) fn set_comment_draft(&mut self, draft: String) {
        self.comment_draft = draft;
    }

    pub(crate) fn set_comment_submitting(&mut self, submitting: bool) {
        self.comment_submitting = submitting;
    }

    pub(crate) fn set_comment_error(&mut self, message: Option<String>) {
        self.comment_error = message;
    }

    fn note_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.discussions
            .iter()
            .flat_map(|d| d.notes().iter().map(|n| n.id))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use tessera_core::{Author, NotePermissions, NoteType, NoteableType};

    pub(crate) fn noteable() -> NoteableData {
        NoteableData {
            id: 26,
            noteable_type: NoteableType::Issue,
            iid: 26,
            title: "Fix login".to_string(),
        }
    }

    pub(crate) fn user() -> UserData {
        UserData {
            id: 1,
            name: "Jane Doe".to_string(),
            username: "jdoe".to_string(),
            can_create_note: true,
        }
    }

    pub(crate) fn store() -> NotesStore {
        let noteable = noteable();
        let data = NotesData::for_noteable(noteable.noteable_ref(), "/help/markdown")
            .with_quick_actions_docs("/help/quick_actions");
        NotesStore::new(noteable, data, user())
    }

    pub(crate) fn note(id: i64, discussion_id: &str, text: &str) -> Note {
        let at = DateTime::<Utc>::from_timestamp(1_700_000_000 + id, 0).unwrap();
        Note {
            id,
            discussion_id: discussion_id.to_string(),
            note_type: NoteType::Note,
            noteable_type: NoteableType::Issue,
            noteable_id: 26,
            author: Author {
                id: 1,
                name: "Jane Doe".to_string(),
                username: "jdoe".to_string(),
            },
            note: text.to_string(),
            note_html: format!("<p>{}</p>", text),
            created_at: at,
            updated_at: at,
            current_user: NotePermissions { can_edit: true },
        }
    }

    #[test]
    fn test_new_store_is_loading() {
        let store = store();
        assert!(store.is_loading());
        assert!(store.discussions().is_empty());
        assert_eq!(store.last_fetched_at(), None);
        assert_eq!(store.note_state(1), None);
    }

    #[test]
    fn test_set_discussions_tracks_note_states() {
        let mut store = store();
        store.set_discussions(Discussion::group(vec![note(1, "a", "x"), note(2, "b", "y")]));
        assert!(!store.is_loading());
        assert_eq!(store.note_state(1), Some(&NoteState::Display));
        assert_eq!(store.note_count(), 2);

        store.set_note_state(2, NoteState::Editing { draft: "z".into() });
        store.set_discussions(Discussion::group(vec![note(2, "b", "y")]));
        assert_eq!(store.note_state(1), None);
        assert!(store.note_state(2).unwrap().is_editing());
    }

    #[test]
    fn test_upsert_note_appends_new_discussion() {
        let mut store = store();
        store.set_discussions(Discussion::group(vec![note(1, "a", "x")]));
        store.upsert_note(note(5, "e", "new"));
        store.upsert_note(note(1, "a", "changed"));

        let ids: Vec<&str> = store.discussions().iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["a", "e"]);
        assert_eq!(store.find_note(1).unwrap().note, "changed");
        assert_eq!(store.note_state(5), Some(&NoteState::Display));
    }

    #[test]
    fn test_merge_discussion_into_existing_thread() {
        let mut store = store();
        store.set_discussions(Discussion::group(vec![note(1, "a", "x")]));

        let mut reply = note(2, "a", "reply");
        reply.note_type = NoteType::DiscussionNote;
        let thread = Discussion::Thread {
            id: "a".to_string(),
            notes: vec![note(1, "a", "x"), reply],
            resolved: false,
            expanded: true,
        };
        store.merge_discussion(thread);

        assert_eq!(store.discussions().len(), 1);
        assert_eq!(store.discussions()[0].notes().len(), 2);
        assert!(!store.discussions()[0].is_individual());
    }

    #[test]
    fn test_note_state_draft() {
        assert_eq!(NoteState::Display.draft(), None);
        let saving = NoteState::Saving {
            draft: "d".into(),
            seq: 3,
        };
        assert_eq!(saving.draft(), Some("d"));
        assert!(saving.is_saving());
    }
}
