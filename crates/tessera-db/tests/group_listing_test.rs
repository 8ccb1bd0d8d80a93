//! Integration tests for group listings against PostgreSQL.
//!
//! Run with `cargo test -p tessera-db -- --ignored` and a database at
//! `DATABASE_URL`.

use tessera_db::test_fixtures::TestDatabase;
use tessera_db::{
    AccessLevel, GroupPolicy, GroupRepository, GroupScope, GroupSort, ListGroupsRequest,
    PageRequest, Visibility,
};

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_memberships_listing_orders_by_id_desc() {
    let test_db = TestDatabase::new().await;
    let alice = test_db.user("alice", false).await;

    let first = test_db.group("First", Visibility::Private, None).await;
    let second = test_db.group("Second", Visibility::Private, None).await;
    let _other = test_db.group("Other", Visibility::Public, None).await;
    for g in [&first, &second] {
        test_db
            .db
            .groups
            .add_member(g.id, alice.id, AccessLevel::Developer)
            .await
            .unwrap();
    }

    let page = test_db
        .db
        .groups
        .list(
            &GroupScope::Memberships { user_id: alice.id },
            &ListGroupsRequest::default(),
        )
        .await
        .unwrap();

    let ids: Vec<i64> = page.items.iter().map(|s| s.group.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].access_level, Some(AccessLevel::Developer));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_children_listing_loads_routes_and_hides_private() {
    let test_db = TestDatabase::new().await;
    let bob = test_db.user("bob", false).await;

    let parent = test_db.group("Acme", Visibility::Public, None).await;
    let open = test_db.group("Open", Visibility::Public, Some(parent.id)).await;
    let _secret = test_db.group("Secret", Visibility::Private, Some(parent.id)).await;

    let scope = GroupScope::Children {
        parent_id: parent.id,
        viewer: bob.clone(),
    };
    let page = test_db
        .db
        .groups
        .list(&scope, &ListGroupsRequest::default())
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].group.id, open.id);
    assert_eq!(page.items[0].full_path, "acme/open");
    assert_eq!(page.items[0].full_name, "Acme / Open");

    // Membership of the parent grants the private child too.
    test_db
        .db
        .groups
        .add_member(parent.id, bob.id, AccessLevel::Guest)
        .await
        .unwrap();
    let page = test_db
        .db
        .groups
        .list(&scope, &ListGroupsRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_listing_filter_sort_and_page() {
    let test_db = TestDatabase::new().await;
    let admin = test_db.user("root", true).await;
    let parent = test_db.group("Parent", Visibility::Public, None).await;
    for name in ["Alpha", "Beta", "Gamma", "Alphabet"] {
        test_db.group(name, Visibility::Internal, Some(parent.id)).await;
    }

    let scope = GroupScope::Children {
        parent_id: parent.id,
        viewer: admin,
    };
    let req = ListGroupsRequest {
        filter: Some("alp".to_string()),
        sort: GroupSort::NameAsc,
        page: PageRequest::new(Some(1), Some(1), 20),
    };
    let page = test_db.db.groups.list(&scope, &req).await.unwrap();

    assert_eq!(page.total, 2);
    assert_eq!(page.total_pages(), 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].group.name, "Alpha");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_read_group_policy_follows_hierarchy() {
    let test_db = TestDatabase::new().await;
    let carol = test_db.user("carol", false).await;
    let outsider = test_db.user("dave", false).await;

    let top = test_db.group("Top", Visibility::Private, None).await;
    let nested = test_db.group("Nested", Visibility::Private, Some(top.id)).await;
    test_db
        .db
        .groups
        .add_member(top.id, carol.id, AccessLevel::Reporter)
        .await
        .unwrap();

    assert!(test_db.db.groups.can_read_group(&carol, &nested).await.unwrap());
    assert!(!test_db.db.groups.can_read_group(&outsider, &nested).await.unwrap());

    test_db.cleanup().await;
}
