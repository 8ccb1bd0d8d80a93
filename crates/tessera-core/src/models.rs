//! Core data models for tessera.
//!
//! These types are shared across all tessera crates and represent the core
//! domain entities: groups and their listing parameters on the server side,
//! noteables, notes and discussions on both sides of the notes API.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::pagination::PageRequest;

// =============================================================================
// USER TYPES
// =============================================================================

/// An authenticated platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub name: String,
    /// Administrators can read every group and edit every note.
    #[serde(default)]
    pub admin: bool,
}

/// Membership access level, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Guest,
    Reporter,
    Developer,
    Maintainer,
    Owner,
}

impl AccessLevel {
    /// Numeric value stored in `group_member.access_level`.
    pub const fn value(self) -> i16 {
        match self {
            AccessLevel::Guest => 10,
            AccessLevel::Reporter => 20,
            AccessLevel::Developer => 30,
            AccessLevel::Maintainer => 40,
            AccessLevel::Owner => 50,
        }
    }

    pub fn from_value(value: i16) -> Option<Self> {
        match value {
            10 => Some(AccessLevel::Guest),
            20 => Some(AccessLevel::Reporter),
            30 => Some(AccessLevel::Developer),
            40 => Some(AccessLevel::Maintainer),
            50 => Some(AccessLevel::Owner),
            _ => None,
        }
    }

    /// Human-readable role name.
    pub fn human_name(self) -> &'static str {
        match self {
            AccessLevel::Guest => "Guest",
            AccessLevel::Reporter => "Reporter",
            AccessLevel::Developer => "Developer",
            AccessLevel::Maintainer => "Maintainer",
            AccessLevel::Owner => "Owner",
        }
    }
}

// =============================================================================
// GROUP TYPES
// =============================================================================

/// Who may see a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Internal,
    Public,
}

impl Visibility {
    /// Numeric level stored in `namespace.visibility_level`.
    pub const fn level(self) -> i16 {
        match self {
            Visibility::Private => 0,
            Visibility::Internal => 10,
            Visibility::Public => 20,
        }
    }

    /// Unknown levels round down to the closest known one.
    pub fn from_level(level: i16) -> Self {
        match level {
            l if l >= 20 => Visibility::Public,
            l if l >= 10 => Visibility::Internal,
            _ => Visibility::Private,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Internal => "internal",
            Visibility::Public => "public",
        }
    }
}

/// A group (namespace) in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    /// URL slug of this group relative to its parent.
    pub path: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    /// Parent group for nested hierarchy (None = top level)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

/// A group as returned by the listing: route eager-loaded plus computed fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group: Group,
    /// Full slash-joined route, e.g. `acme/platform/infra`.
    pub full_path: String,
    /// Human route, e.g. `Acme / Platform / Infra`.
    pub full_name: String,
    /// Number of direct subgroups.
    #[serde(default)]
    pub children_count: i64,
    /// The viewer's direct membership level, if any.
    #[serde(default)]
    pub access_level: Option<AccessLevel>,
}

/// Sort orders accepted by the group listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GroupSort {
    #[default]
    IdDesc,
    IdAsc,
    NameAsc,
    NameDesc,
    CreatedDesc,
    CreatedAsc,
    LatestActivityDesc,
    LatestActivityAsc,
}

impl GroupSort {
    pub const ALL: [GroupSort; 8] = [
        GroupSort::IdDesc,
        GroupSort::IdAsc,
        GroupSort::NameAsc,
        GroupSort::NameDesc,
        GroupSort::CreatedDesc,
        GroupSort::CreatedAsc,
        GroupSort::LatestActivityDesc,
        GroupSort::LatestActivityAsc,
    ];

    /// Parse a caller-supplied key; absent or unknown keys give the default.
    pub fn parse(key: Option<&str>) -> Self {
        key.and_then(|k| k.parse().ok()).unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GroupSort::IdDesc => "id_desc",
            GroupSort::IdAsc => "id_asc",
            GroupSort::NameAsc => "name_asc",
            GroupSort::NameDesc => "name_desc",
            GroupSort::CreatedDesc => "created_desc",
            GroupSort::CreatedAsc => "created_asc",
            GroupSort::LatestActivityDesc => "latest_activity_desc",
            GroupSort::LatestActivityAsc => "latest_activity_asc",
        }
    }

    /// Ordering of two groups under this key. Ties fall back to id descending
    /// so every key yields a total order.
    pub fn compare(self, a: &Group, b: &Group) -> Ordering {
        let primary = match self {
            GroupSort::IdDesc => b.id.cmp(&a.id),
            GroupSort::IdAsc => a.id.cmp(&b.id),
            GroupSort::NameAsc => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            GroupSort::NameDesc => b.name.to_lowercase().cmp(&a.name.to_lowercase()),
            GroupSort::CreatedDesc => b.created_at_utc.cmp(&a.created_at_utc),
            GroupSort::CreatedAsc => a.created_at_utc.cmp(&b.created_at_utc),
            GroupSort::LatestActivityDesc => b.updated_at_utc.cmp(&a.updated_at_utc),
            GroupSort::LatestActivityAsc => a.updated_at_utc.cmp(&b.updated_at_utc),
        };
        primary.then_with(|| b.id.cmp(&a.id))
    }
}

impl FromStr for GroupSort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GroupSort::ALL
            .into_iter()
            .find(|sort| sort.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown sort key '{}'", s)))
    }
}

impl fmt::Display for GroupSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which groups a listing draws from, before filter/sort/page are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupScope {
    /// Groups the user is a direct member of.
    Memberships { user_id: i64 },
    /// Direct children of `parent_id` that `viewer` may read.
    Children { parent_id: i64, viewer: User },
}

/// Filter, sort and page applied on top of a [`GroupScope`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListGroupsRequest {
    /// Case-insensitive substring matched against name and path.
    pub filter: Option<String>,
    pub sort: GroupSort,
    pub page: PageRequest,
}

impl ListGroupsRequest {
    /// The filter, if it contains anything besides whitespace.
    pub fn search_term(&self) -> Option<&str> {
        self.filter
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}

/// True when `group` matches a listing search term.
pub fn group_matches_search(group: &Group, term: &str) -> bool {
    let term = term.to_lowercase();
    group.name.to_lowercase().contains(&term) || group.path.to_lowercase().contains(&term)
}

// =============================================================================
// NOTEABLE TYPES
// =============================================================================

/// Kind of entity that owns notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteableType {
    Issue,
    MergeRequest,
}

impl NoteableType {
    pub fn as_str(self) -> &'static str {
        match self {
            NoteableType::Issue => "issue",
            NoteableType::MergeRequest => "merge_request",
        }
    }

    /// Plural form used in URL paths.
    pub fn path_segment(self) -> &'static str {
        match self {
            NoteableType::Issue => "issues",
            NoteableType::MergeRequest => "merge_requests",
        }
    }
}

impl FromStr for NoteableType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issue" | "issues" => Ok(NoteableType::Issue),
            "merge_request" | "merge_requests" => Ok(NoteableType::MergeRequest),
            other => Err(Error::InvalidInput(format!(
                "unknown noteable type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for NoteableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a single noteable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteableRef {
    pub noteable_type: NoteableType,
    pub noteable_id: i64,
}

impl NoteableRef {
    pub fn new(noteable_type: NoteableType, noteable_id: i64) -> Self {
        Self {
            noteable_type,
            noteable_id,
        }
    }

    /// Path of the discussions listing for this noteable.
    pub fn discussions_path(&self) -> String {
        format!(
            "/noteables/{}/{}/discussions",
            self.noteable_type.path_segment(),
            self.noteable_id
        )
    }

    /// Path used to create and poll notes for this noteable.
    pub fn notes_path(&self) -> String {
        format!(
            "/noteables/{}/{}/notes",
            self.noteable_type.path_segment(),
            self.noteable_id
        )
    }
}

/// Descriptor of the noteable handed to the notes panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteableData {
    pub id: i64,
    pub noteable_type: NoteableType,
    /// Project-scoped number shown to users (`#26`).
    pub iid: i64,
    pub title: String,
}

impl NoteableData {
    pub fn noteable_ref(&self) -> NoteableRef {
        NoteableRef::new(self.noteable_type, self.id)
    }
}

/// Document links and endpoint configuration for the notes panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesData {
    pub markdown_docs_path: String,
    /// Absent when quick actions are not available on this noteable.
    #[serde(default)]
    pub quick_actions_docs_path: Option<String>,
    pub discussions_path: String,
    pub notes_path: String,
    /// Server timestamp (unix seconds) of the last successful sync.
    #[serde(default)]
    pub last_fetched_at: Option<i64>,
}

impl NotesData {
    /// Endpoint configuration pointing at the standard paths for `noteable`.
    pub fn for_noteable(noteable: NoteableRef, markdown_docs_path: impl Into<String>) -> Self {
        Self {
            markdown_docs_path: markdown_docs_path.into(),
            quick_actions_docs_path: None,
            discussions_path: noteable.discussions_path(),
            notes_path: noteable.notes_path(),
            last_fetched_at: None,
        }
    }

    pub fn with_quick_actions_docs(mut self, path: impl Into<String>) -> Self {
        self.quick_actions_docs_path = Some(path.into());
        self
    }
}

/// The viewer as seen by the notes panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub id: i64,
    pub name: String,
    pub username: String,
    #[serde(default = "default_true")]
    pub can_create_note: bool,
}

fn default_true() -> bool {
    true
}

// =============================================================================
// NOTE TYPES
// =============================================================================

/// Author of a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub username: String,
}

impl From<&User> for Author {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            username: user.username.clone(),
        }
    }
}

/// Whether a note stands alone or belongs to a threaded discussion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NoteType {
    #[default]
    Note,
    DiscussionNote,
}

impl NoteType {
    pub fn as_str(self) -> &'static str {
        match self {
            NoteType::Note => "Note",
            NoteType::DiscussionNote => "DiscussionNote",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "DiscussionNote" => NoteType::DiscussionNote,
            _ => NoteType::Note,
        }
    }
}

/// What the viewer may do with a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotePermissions {
    pub can_edit: bool,
}

/// A single comment on a noteable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub discussion_id: String,
    #[serde(rename = "type", default)]
    pub note_type: NoteType,
    pub noteable_type: NoteableType,
    pub noteable_id: i64,
    pub author: Author,
    /// Raw markdown source.
    pub note: String,
    /// Rendered HTML.
    pub note_html: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub current_user: NotePermissions,
}

impl Note {
    /// Fill in `current_user` for `viewer`: authors and admins may edit.
    pub fn with_permissions(mut self, viewer: &User) -> Self {
        self.current_user.can_edit = self.editable_by(viewer);
        self
    }

    pub fn editable_by(&self, viewer: &User) -> bool {
        viewer.admin || self.author.id == viewer.id
    }

    pub fn noteable(&self) -> NoteableRef {
        NoteableRef::new(self.noteable_type, self.noteable_id)
    }
}

/// A note together with the discussion grouping it is displayed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discussion {
    /// A standalone note.
    Individual { id: String, note: Note },
    /// Several notes threaded under one discussion id.
    Thread {
        id: String,
        notes: Vec<Note>,
        #[serde(default)]
        resolved: bool,
        #[serde(default = "default_true")]
        expanded: bool,
    },
}

impl Discussion {
    pub fn id(&self) -> &str {
        match self {
            Discussion::Individual { id, .. } | Discussion::Thread { id, .. } => id,
        }
    }

    pub fn is_individual(&self) -> bool {
        matches!(self, Discussion::Individual { .. })
    }

    pub fn notes(&self) -> &[Note] {
        match self {
            Discussion::Individual { note, .. } => std::slice::from_ref(note),
            Discussion::Thread { notes, .. } => notes,
        }
    }

    pub fn notes_mut(&mut self) -> &mut [Note] {
        match self {
            Discussion::Individual { note, .. } => std::slice::from_mut(note),
            Discussion::Thread { notes, .. } => notes,
        }
    }

    pub fn first_note(&self) -> Option<&Note> {
        self.notes().first()
    }

    pub fn find_note(&self, note_id: i64) -> Option<&Note> {
        self.notes().iter().find(|n| n.id == note_id)
    }

    pub fn find_note_mut(&mut self, note_id: i64) -> Option<&mut Note> {
        self.notes_mut().iter_mut().find(|n| n.id == note_id)
    }

    /// Insert or replace `note`. A reply to an individual note turns it into
    /// a thread.
    pub fn upsert_note(&mut self, note: Note) {
        if let Some(existing) = self.find_note_mut(note.id) {
            *existing = note;
            return;
        }
        match self {
            Discussion::Thread { notes, .. } => {
                notes.push(note);
                notes.sort_by_key(|n| n.id);
            }
            Discussion::Individual { id, note: first } => {
                let mut notes = vec![first.clone(), note];
                notes.sort_by_key(|n| n.id);
                *self = Discussion::Thread {
                    id: id.clone(),
                    notes,
                    resolved: false,
                    expanded: true,
                };
            }
        }
    }

    /// Group notes into discussions, ordered by their first note's id.
    pub fn group(mut notes: Vec<Note>) -> Vec<Discussion> {
        notes.sort_by_key(|n| n.id);

        let mut discussions: Vec<Discussion> = Vec::new();
        for note in notes {
            if let Some(existing) = discussions
                .iter_mut()
                .find(|d| d.id() == note.discussion_id)
            {
                existing.upsert_note(note);
                continue;
            }
            let discussion = match note.note_type {
                NoteType::Note => Discussion::Individual {
                    id: note.discussion_id.clone(),
                    note,
                },
                NoteType::DiscussionNote => Discussion::Thread {
                    id: note.discussion_id.clone(),
                    notes: vec![note],
                    resolved: false,
                    expanded: true,
                },
            };
            discussions.push(discussion);
        }
        discussions
    }
}

/// Response of the notes polling endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesPollResponse {
    pub notes: Vec<Note>,
    /// Server timestamp to send with the next poll.
    pub last_fetched_at: i64,
}

/// Request for persisting a new note.
#[derive(Debug, Clone)]
pub struct CreateNoteRequest {
    pub noteable: NoteableRef,
    pub author_id: i64,
    pub note: String,
    pub note_html: String,
    /// Reply into this discussion; a fresh individual note when None.
    pub discussion_id: Option<String>,
}
