//! # tessera-db
//!
//! PostgreSQL database layer for tessera.
//!
//! This crate provides:
//! - Connection pool management
//! - Group listings scoped by membership or parent, with routes and access levels
//! - Notes grouped into discussions, with incremental fetch for polling
//! - Users and personal access tokens
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_db::{Database, GroupRepository, GroupScope, ListGroupsRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/tessera").await?;
//!     db.migrate().await?;
//!
//!     let page = db
//!         .groups
//!         .list(&GroupScope::Memberships { user_id: 1 }, &ListGroupsRequest::default())
//!         .await?;
//!     println!("{} groups", page.total);
//!     Ok(())
//! }
//! ```
pub mod groups;
pub mod notes;
pub mod pool;
pub mod users;

// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use tessera_core::*;

pub use groups::PgGroupRepository;
pub use notes::PgNoteRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use users::{token_digest, PgUserRepository, TOKEN_PREFIX};

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Group repository for listings and membership.
    pub groups: PgGroupRepository,
    /// User and token repository.
    pub users: PgUserRepository,
    /// Note repository.
    pub notes: PgNoteRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            groups: PgGroupRepository::new(pool.clone()),
            users: PgUserRepository::new(pool.clone()),
            notes: PgNoteRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
