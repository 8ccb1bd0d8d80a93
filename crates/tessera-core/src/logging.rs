//! Structured logging schema and field name constants for tessera.
//!
//! All crates use these names for structured logging fields so log
//! aggregation can query by the same field across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), mutations |
//! | DEBUG | Decision points, query shapes, state transitions |
//! | TRACE | Per-item iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated from the HTTP layer. Format: UUIDv7.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "db", "notes"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "group_listing", "pool", "panel", "http_service"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "list", "update_note", "poll"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Authenticated user performing the request.
pub const USER_ID: &str = "user_id";

/// Group being operated on.
pub const GROUP_ID: &str = "group_id";

/// Parent group of a scoped listing.
pub const PARENT_ID: &str = "parent_id";

/// Note being operated on.
pub const NOTE_ID: &str = "note_id";

/// Noteable (issue / merge request) owning the notes.
pub const NOTEABLE_ID: &str = "noteable_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a query.
pub const RESULT_COUNT: &str = "result_count";

/// Total matching rows before pagination.
pub const TOTAL: &str = "total";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
