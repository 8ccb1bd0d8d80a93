//! # tessera-notes
//!
//! Client side of tessera notes.
//!
//! This crate provides:
//! - [`NotesPanel`], the per-noteable state machine driving note display,
//!   inline editing, new comments and polling
//! - [`NotesStore`], the explicit state the panel owns
//! - Form and panel view-models ready for a template layer
//! - The [`NotesService`] transport trait with an HTTP implementation
//! - An in-memory service for tests (feature `mock`)
//!
//! # Example
//!
//! ```rust,no_run
//! use tessera_notes::{HttpNotesService, NotesPanel, NotesStore};
//! use tessera_core::{NoteableData, NoteableType, NotesData, UserData};
//!
//! #[tokio::main]
//! async fn main() -> tessera_core::Result<()> {
//!     let noteable = NoteableData {
//!         id: 26,
//!         noteable_type: NoteableType::Issue,
//!         iid: 26,
//!         title: "Fix login".to_string(),
//!     };
//!     let data = NotesData::for_noteable(noteable.noteable_ref(), "/help/markdown");
//!     let user = UserData {
//!         id: 1,
//!         name: "Jane Doe".to_string(),
//!         username: "jdoe".to_string(),
//!         can_create_note: true,
//!     };
//!
//!     let mut panel = NotesPanel::new(
//!         NotesStore::new(noteable, data, user),
//!         HttpNotesService::from_env()?,
//!     );
//!     panel.load().await?;
//!     Ok(())
//! }
//! ```

pub mod forms;
pub mod http;
pub mod panel;
pub mod service;
pub mod store;
pub mod view;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use forms::{CommentForm, DocLink, EditForm};
pub use http::{HttpNotesService, NotesClientConfig};
pub use panel::{NotesPanel, PendingUpdate};
pub use service::{NotesEndpoints, NotesService};
pub use store::{NoteState, NotesStore};
pub use view::{DiscussionView, NoteView, PanelView};
