//! Centralized default constants for tessera.
//!
//! Crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for the group listing.
pub const PER_PAGE: u32 = 20;

/// Upper bound for a caller-supplied page size.
pub const PER_PAGE_MAX: u32 = 100;

/// First page number (pages are 1-based).
pub const FIRST_PAGE: u32 = 1;

// =============================================================================
// GROUP LISTING
// =============================================================================

/// Whether nested group listing is available unless configured otherwise.
pub const NESTED_GROUPS_ENABLED: bool = true;

// =============================================================================
// NOTES FORMS
// =============================================================================

/// Placeholder shown in the new-note textarea.
pub const COMMENT_PLACEHOLDER: &str = "Write a comment or drag your files here...";

/// Label of the markdown help link on the new-note form.
pub const MARKDOWN_LINK_LABEL: &str = "Markdown";

/// Label of the markdown help link on the edit form.
pub const MARKDOWN_EDIT_LINK_LABEL: &str = "Markdown is supported";

/// Label of the quick-actions help link on the new-note form.
pub const QUICK_ACTIONS_LINK_LABEL: &str = "quick actions";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default rate limit: max requests per period.
pub const RATE_LIMIT_REQUESTS: u64 = 100;

/// Default rate limit: period in seconds.
pub const RATE_LIMIT_PERIOD_SECS: u64 = 60;

/// Maximum accepted request body (notes are plain markdown).
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

// =============================================================================
// NOTES CLIENT
// =============================================================================

/// Default base URL of the tessera server.
pub const CLIENT_BASE_URL: &str = "http://localhost:3000";

/// Default request timeout for the notes client (seconds).
pub const CLIENT_TIMEOUT_SECS: u64 = 30;
