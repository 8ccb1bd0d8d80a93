//! In-memory notes service for deterministic testing.
//!
//! Behaves like a tiny tessera server: notes live in memory, updates are
//! rendered with [`PlainTextRenderer`], and every mutation advances a logical
//! clock so polling is reproducible.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tessera_notes::mock::MockNotesService;
//!
//! let service = MockNotesService::new().with_failure("update_note", "boom");
//! assert_eq!(service.update_call_count(), 0);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tessera_core::{
    Author, Discussion, Error, MarkdownRenderer, Note, NoteType, NoteableRef, NotesPollResponse,
    PlainTextRenderer, Result,
};

use crate::service::{NotesEndpoints, NotesService};

/// Mock notes service for testing.
#[derive(Clone)]
pub struct MockNotesService {
    author: Arc<Author>,
    server: Arc<Mutex<MockServerState>>,
    failures: Arc<Mutex<HashMap<String, String>>>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Default)]
struct MockServerState {
    notes: Vec<Note>,
    /// Logical unix timestamp, bumped by every write.
    clock: i64,
}

impl MockServerState {
    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += 1;
        DateTime::<Utc>::from_timestamp(self.clock, 0).unwrap_or_default()
    }

    fn next_id(&self) -> i64 {
        self.notes.iter().map(|n| n.id).max().unwrap_or(0) + 1
    }

    fn discussion(&self, discussion_id: &str) -> Option<Discussion> {
        let notes = self
            .notes
            .iter()
            .filter(|n| n.discussion_id == discussion_id)
            .cloned()
            .collect();
        Discussion::group(notes).into_iter().next()
    }
}

#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: String,
    pub note_id: Option<i64>,
    pub input: String,
    pub timestamp: std::time::Instant,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for MockNotesService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNotesService {
    /// Create an empty mock whose new notes are authored by "Mock User".
    pub fn new() -> Self {
        Self {
            author: Arc::new(Author {
                id: 1,
                name: "Mock User".to_string(),
                username: "mock".to_string(),
            }),
            server: Arc::new(Mutex::new(MockServerState::default())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Author attached to notes created through this service.
    pub fn with_author(mut self, author: Author) -> Self {
        self.author = Arc::new(author);
        self
    }

    /// Seed the server with the notes of `discussions`.
    pub fn with_discussions(self, discussions: Vec<Discussion>) -> Self {
        {
            let mut server = lock(&self.server);
            for discussion in discussions {
                for note in discussion.notes() {
                    server.clock = server.clock.max(note.updated_at.timestamp());
                    server.notes.push(note.clone());
                }
            }
        }
        self
    }

    /// Make `operation` fail with a 500 carrying `message`.
    pub fn with_failure(self, operation: &str, message: impl Into<String>) -> Self {
        self.fail(operation, message);
        self
    }

    pub fn fail(&self, operation: &str, message: impl Into<String>) {
        lock(&self.failures).insert(operation.to_string(), message.into());
    }

    /// Stop failing `operation`.
    pub fn recover(&self, operation: &str) {
        lock(&self.failures).remove(operation);
    }

    /// Simulate another client editing a note on the server.
    pub fn edit_remote(&self, note_id: i64, content: &str) -> Result<Note> {
        let mut server = lock(&self.server);
        let at = server.tick();
        let note = server
            .notes
            .iter_mut()
            .find(|n| n.id == note_id)
            .ok_or(Error::NoteNotFound(note_id))?;
        note.note = content.to_string();
        note.note_html = PlainTextRenderer.render(content);
        note.updated_at = at;
        Ok(note.clone())
    }

    /// Simulate another client adding a note on the server.
    pub fn add_remote(&self, noteable: NoteableRef, author: Author, content: &str) -> Note {
        let mut server = lock(&self.server);
        let note = new_note(&mut server, noteable, author, content, None);
        server.notes.push(note.clone());
        note
    }

    /// Current server copy of a note.
    pub fn note(&self, note_id: i64) -> Option<Note> {
        lock(&self.server)
            .notes
            .iter()
            .find(|n| n.id == note_id)
            .cloned()
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        lock(&self.call_log).clone()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        lock(&self.call_log).clear()
    }

    /// `(note_id, content)` of every `update_note` call, in call order.
    pub fn update_calls(&self) -> Vec<(i64, String)> {
        lock(&self.call_log)
            .iter()
            .filter(|c| c.operation == "update_note")
            .filter_map(|c| c.note_id.map(|id| (id, c.input.clone())))
            .collect()
    }

    pub fn update_call_count(&self) -> usize {
        self.call_count("update_note")
    }

    pub fn create_call_count(&self) -> usize {
        self.call_count("create_note")
    }

    pub fn call_count(&self, operation: &str) -> usize {
        lock(&self.call_log)
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    fn log_call(&self, operation: &str, note_id: Option<i64>, input: &str) {
        lock(&self.call_log).push(MockCall {
            operation: operation.to_string(),
            note_id,
            input: input.to_string(),
            timestamp: std::time::Instant::now(),
        });
    }

    fn check_failure(&self, operation: &str) -> Result<()> {
        match lock(&self.failures).get(operation) {
            Some(message) => Err(Error::Remote {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn new_note(
    server: &mut MockServerState,
    noteable: NoteableRef,
    author: Author,
    content: &str,
    discussion_id: Option<&str>,
) -> Note {
    let id = server.next_id();
    let at = server.tick();
    let (discussion_id, note_type) = match discussion_id {
        Some(existing) => (existing.to_string(), NoteType::DiscussionNote),
        None => (format!("mock-discussion-{}", id), NoteType::Note),
    };
    Note {
        id,
        discussion_id,
        note_type,
        noteable_type: noteable.noteable_type,
        noteable_id: noteable.noteable_id,
        author,
        note: content.to_string(),
        note_html: PlainTextRenderer.render(content),
        created_at: at,
        updated_at: at,
        current_user: Default::default(),
    }
}

#[async_trait]
impl NotesService for MockNotesService {
    async fn fetch_discussions(&self, endpoints: &NotesEndpoints) -> Result<Vec<Discussion>> {
        self.log_call("fetch_discussions", None, &endpoints.discussions_path);
        self.check_failure("fetch_discussions")?;
        Ok(Discussion::group(lock(&self.server).notes.clone()))
    }

    async fn update_note(&self, note_id: i64, content: &str) -> Result<Note> {
        self.log_call("update_note", Some(note_id), content);
        self.check_failure("update_note")?;
        self.edit_remote(note_id, content)
    }

    async fn create_note(
        &self,
        endpoints: &NotesEndpoints,
        content: &str,
        discussion_id: Option<&str>,
    ) -> Result<Discussion> {
        self.log_call("create_note", None, content);
        self.check_failure("create_note")?;

        let mut server = lock(&self.server);
        let noteable = match discussion_id {
            Some(id) => server
                .notes
                .iter()
                .find(|n| n.discussion_id == id)
                .map(Note::noteable)
                .ok_or_else(|| Error::NotFound(format!("Discussion {} not found", id)))?,
            None => noteable_from_path(&endpoints.notes_path)?,
        };
        let mut note = new_note(
            &mut server,
            noteable,
            (*self.author).clone(),
            content,
            discussion_id,
        );
        note.current_user.can_edit = true;
        let discussion_id = note.discussion_id.clone();
        server.notes.push(note);
        server
            .discussion(&discussion_id)
            .ok_or_else(|| Error::Internal("created note has no discussion".to_string()))
    }

    async fn poll(
        &self,
        _endpoints: &NotesEndpoints,
        last_fetched_at: Option<i64>,
    ) -> Result<NotesPollResponse> {
        self.log_call(
            "poll",
            None,
            &last_fetched_at.map(|t| t.to_string()).unwrap_or_default(),
        );
        self.check_failure("poll")?;

        let since = last_fetched_at.unwrap_or(i64::MIN);
        let server = lock(&self.server);
        let mut notes: Vec<Note> = server
            .notes
            .iter()
            .filter(|n| n.updated_at.timestamp() > since)
            .cloned()
            .collect();
        notes.sort_by_key(|n| n.id);
        Ok(NotesPollResponse {
            notes,
            last_fetched_at: server.clock,
        })
    }
}

/// Parse `/noteables/{type}/{id}/notes`.
fn noteable_from_path(path: &str) -> Result<NoteableRef> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match segments.as_slice() {
        ["noteables", kind, id, "notes"] => {
            let noteable_type = kind.parse()?;
            let noteable_id = id
                .parse()
                .map_err(|_| Error::InvalidInput(format!("bad noteable id '{}'", id)))?;
            Ok(NoteableRef::new(noteable_type, noteable_id))
        }
        _ => Err(Error::InvalidInput(format!("unexpected notes path '{}'", path))),
    }
}
