//! Dashboard group listing.
//!
//! Resolves which groups a user sees: the children of a readable parent when
//! nested groups are enabled and a parent is requested, otherwise the user's
//! own memberships. Missing or unreadable parents produce an empty page.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use tessera_core::{
    Group, GroupPolicy, GroupRepository, GroupScope, GroupSummary, ListGroupsRequest, Paginated,
    Result, User,
};

/// Parameters of one listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListGroupsParams {
    /// Raw `parent_id` as sent by the caller. A value that does not name an
    /// existing group behaves like an unreadable parent.
    pub parent_id: Option<String>,
    pub request: ListGroupsRequest,
}

#[derive(Clone)]
pub struct GroupListing {
    groups: Arc<dyn GroupRepository>,
    policy: Arc<dyn GroupPolicy>,
    nested_groups_enabled: bool,
}

impl GroupListing {
    pub fn new(
        groups: Arc<dyn GroupRepository>,
        policy: Arc<dyn GroupPolicy>,
        nested_groups_enabled: bool,
    ) -> Self {
        Self {
            groups,
            policy,
            nested_groups_enabled,
        }
    }

    /// Groups visible to `user` for `params`, filtered, sorted and paged.
    pub async fn list(
        &self,
        user: &User,
        params: &ListGroupsParams,
    ) -> Result<Paginated<GroupSummary>> {
        let start = Instant::now();

        let scope = match params.parent_id.as_deref() {
            Some(raw) if self.nested_groups_enabled => match self.readable_parent(user, raw).await? {
                Some(parent) => GroupScope::Children {
                    parent_id: parent.id,
                    viewer: user.clone(),
                },
                None => {
                    debug!(
                        subsystem = "api",
                        component = "group_listing",
                        op = "list",
                        user_id = user.id,
                        parent = raw,
                        "Parent missing or unreadable, returning empty listing"
                    );
                    return Ok(Paginated::empty(params.request.page));
                }
            },
            _ => GroupScope::Memberships { user_id: user.id },
        };

        let page = self.groups.list(&scope, &params.request).await?;

        debug!(
            subsystem = "api",
            component = "group_listing",
            op = "list",
            user_id = user.id,
            sort = params.request.sort.as_str(),
            result_count = page.items.len(),
            total = page.total,
            duration_ms = start.elapsed().as_millis() as u64,
            "Group listing resolved"
        );
        Ok(page)
    }

    async fn readable_parent(&self, user: &User, raw: &str) -> Result<Option<Group>> {
        let Ok(id) = raw.trim().parse::<i64>() else {
            return Ok(None);
        };
        let Some(parent) = self.groups.find(id).await? else {
            return Ok(None);
        };
        if self.policy.can_read_group(user, &parent).await? {
            Ok(Some(parent))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_store::FakeStore;
    use tessera_core::{GroupSort, PageRequest, Visibility};

    async fn setup() -> (Arc<FakeStore>, User, User) {
        let store = Arc::new(FakeStore::default());
        let member = store.add_user("member", false).await;
        let outsider = store.add_user("outsider", false).await;
        let secret = store.add_group(10, "Secret", Visibility::Private, None).await;
        store.add_group(11, "Child A", Visibility::Private, Some(10)).await;
        store.add_group(12, "Child B", Visibility::Public, Some(10)).await;
        store.add_group(20, "Own", Visibility::Private, None).await;
        store.add_member(secret.id, member.id).await;
        store.add_member(20, member.id).await;
        (store, member, outsider)
    }

    fn listing(store: &Arc<FakeStore>, nested: bool) -> GroupListing {
        GroupListing::new(store.clone(), store.clone(), nested)
    }

    fn with_parent(parent: &str) -> ListGroupsParams {
        ListGroupsParams {
            parent_id: Some(parent.to_string()),
            request: ListGroupsRequest::default(),
        }
    }

    fn ids(page: &Paginated<GroupSummary>) -> Vec<i64> {
        page.items.iter().map(|s| s.group.id).collect()
    }

    #[tokio::test]
    async fn test_unreadable_parent_yields_empty_page() {
        let (store, _, outsider) = setup().await;
        let page = listing(&store, true)
            .list(&outsider, &with_parent("10"))
            .await
            .unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_missing_or_garbage_parent_yields_empty_page() {
        let (store, member, _) = setup().await;
        let listing = listing(&store, true);
        for parent in ["999", "abc", ""] {
            let page = listing.list(&member, &with_parent(parent)).await.unwrap();
            assert!(page.is_empty(), "parent {:?}", parent);
        }
    }

    #[tokio::test]
    async fn test_readable_parent_lists_children() {
        let (store, member, _) = setup().await;
        let page = listing(&store, true)
            .list(&member, &with_parent("10"))
            .await
            .unwrap();
        assert_eq!(ids(&page), vec![12, 11]);
    }

    #[tokio::test]
    async fn test_nested_disabled_ignores_parent() {
        let (store, member, _) = setup().await;
        let page = listing(&store, false)
            .list(&member, &with_parent("10"))
            .await
            .unwrap();
        assert_eq!(ids(&page), vec![20, 10]);
    }

    #[tokio::test]
    async fn test_memberships_filter_sort_page() {
        let (store, member, _) = setup().await;
        let params = ListGroupsParams {
            parent_id: None,
            request: ListGroupsRequest {
                filter: Some("  own ".to_string()),
                sort: GroupSort::NameAsc,
                page: PageRequest::default(),
            },
        };
        let page = listing(&store, true).list(&member, &params).await.unwrap();
        assert_eq!(ids(&page), vec![20]);

        let params = ListGroupsParams {
            parent_id: None,
            request: ListGroupsRequest {
                filter: None,
                sort: GroupSort::IdAsc,
                page: PageRequest::new(Some(2), Some(1), 20),
            },
        };
        let page = listing(&store, true).list(&member, &params).await.unwrap();
        assert_eq!(ids(&page), vec![20]);
        assert_eq!(page.total, 2);
    }
}
