//! Core traits for tessera abstractions.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::*;
use crate::pagination::Paginated;

// =============================================================================
// GROUP REPOSITORY TRAITS
// =============================================================================

/// Repository for group lookups and listings.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Find a group by id.
    async fn find(&self, id: i64) -> Result<Option<Group>>;

    /// List groups in `scope`, applying search, route loading, sort and page.
    async fn list(
        &self,
        scope: &GroupScope,
        req: &ListGroupsRequest,
    ) -> Result<Paginated<GroupSummary>>;
}

/// Authorization checks on groups.
#[async_trait]
pub trait GroupPolicy: Send + Sync {
    /// Whether `user` may read `group` (the `read_group` ability).
    async fn can_read_group(&self, user: &User, group: &Group) -> Result<bool>;
}

// =============================================================================
// USER REPOSITORY TRAITS
// =============================================================================

/// Repository for users and their access tokens.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by id.
    async fn find(&self, id: i64) -> Result<Option<User>>;

    /// Resolve a personal access token to its owner.
    async fn find_by_token(&self, token: &str) -> Result<Option<User>>;
}

// =============================================================================
// NOTE REPOSITORY TRAITS
// =============================================================================

/// Repository for notes on noteables.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// All notes of a noteable grouped into discussions, oldest first.
    async fn list_discussions(&self, noteable: NoteableRef) -> Result<Vec<Discussion>>;

    /// The discussion with `discussion_id`, if it belongs to `noteable`.
    async fn find_discussion(
        &self,
        noteable: NoteableRef,
        discussion_id: &str,
    ) -> Result<Option<Discussion>>;

    /// Notes of a noteable updated strictly after `since`.
    async fn notes_since(&self, noteable: NoteableRef, since: DateTime<Utc>) -> Result<Vec<Note>>;

    /// Find a note by id.
    async fn find(&self, id: i64) -> Result<Option<Note>>;

    /// Persist a new note and return it.
    async fn insert(&self, req: CreateNoteRequest) -> Result<Note>;

    /// Replace a note's source and rendered HTML.
    async fn update(&self, id: i64, note: &str, note_html: &str) -> Result<Note>;
}
