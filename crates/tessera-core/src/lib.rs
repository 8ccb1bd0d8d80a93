//! # tessera-core
//!
//! Core types, traits, and abstractions for tessera.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the database layer, the HTTP API and the notes client depend on.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod markdown;
pub mod models;
pub mod pagination;
pub mod policy;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use markdown::{MarkdownRenderer, PlainTextRenderer};
pub use models::*;
pub use pagination::{PageRequest, Paginated};
pub use policy::can_read_group;
pub use traits::*;
