//! Transport abstraction between the notes panel and the tessera server.

use async_trait::async_trait;

use tessera_core::{Discussion, Note, NotesData, NotesPollResponse, Result};

/// Server paths the panel talks to for one noteable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesEndpoints {
    pub discussions_path: String,
    pub notes_path: String,
}

impl From<&NotesData> for NotesEndpoints {
    fn from(data: &NotesData) -> Self {
        Self {
            discussions_path: data.discussions_path.clone(),
            notes_path: data.notes_path.clone(),
        }
    }
}

/// Remote notes operations used by [`crate::NotesPanel`].
///
/// Every call is an independent request; implementations must not hold any
/// per-panel state between calls.
#[async_trait]
pub trait NotesService: Send + Sync {
    /// All discussions of the noteable, ordered by first note id.
    async fn fetch_discussions(&self, endpoints: &NotesEndpoints) -> Result<Vec<Discussion>>;

    /// Replace the content of a note and return it freshly rendered.
    async fn update_note(&self, note_id: i64, content: &str) -> Result<Note>;

    /// Create a note (a reply when `discussion_id` is given) and return the
    /// discussion that now contains it.
    async fn create_note(
        &self,
        endpoints: &NotesEndpoints,
        content: &str,
        discussion_id: Option<&str>,
    ) -> Result<Discussion>;

    /// Notes updated after `last_fetched_at` (unix seconds).
    async fn poll(
        &self,
        endpoints: &NotesEndpoints,
        last_fetched_at: Option<i64>,
    ) -> Result<NotesPollResponse>;
}
