//! Service layer for business logic.

pub mod group_listing;

pub use group_listing::{GroupListing, ListGroupsParams};
