//! Application state shared across handlers.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{Quota, RateLimiter};
use tessera_core::{
    GroupPolicy, GroupRepository, MarkdownRenderer, NoteRepository, PlainTextRenderer,
    UserRepository,
};
use tessera_db::Database;

use crate::config::AppConfig;
use crate::services::GroupListing;

/// Global rate limiter type (direct quota, no keyed bucketing).
pub type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub notes: Arc<dyn NoteRepository>,
    pub groups: GroupListing,
    pub markdown: Arc<dyn MarkdownRenderer>,
    pub config: Arc<AppConfig>,
    /// None when rate limiting is disabled.
    pub rate_limiter: Option<Arc<GlobalRateLimiter>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserRepository>,
        groups: Arc<dyn GroupRepository>,
        policy: Arc<dyn GroupPolicy>,
        notes: Arc<dyn NoteRepository>,
    ) -> Self {
        let rate_limiter = build_rate_limiter(&config);
        Self {
            users,
            notes,
            groups: GroupListing::new(groups, policy, config.nested_groups_enabled),
            markdown: Arc::new(PlainTextRenderer),
            config: Arc::new(config),
            rate_limiter,
        }
    }

    /// Wire every repository to the PostgreSQL implementations.
    pub fn from_database(db: &Database, config: AppConfig) -> Self {
        let groups = Arc::new(db.groups.clone());
        Self::new(
            config,
            Arc::new(db.users.clone()),
            groups.clone(),
            groups,
            Arc::new(db.notes.clone()),
        )
    }
}

fn build_rate_limiter(config: &AppConfig) -> Option<Arc<GlobalRateLimiter>> {
    if !config.rate_limit_enabled {
        return None;
    }
    let burst = NonZeroU32::new(config.rate_limit_requests.min(u32::MAX as u64) as u32)?;
    let period = Duration::from_secs(config.rate_limit_period_secs.max(1));
    let quota = Quota::with_period(period / burst.get())?.allow_burst(burst);
    Some(Arc::new(RateLimiter::direct(quota)))
}
