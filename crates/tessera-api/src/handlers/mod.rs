//! HTTP handlers for tessera-api.

pub mod groups;
pub mod notes;
