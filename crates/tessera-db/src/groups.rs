//! Group repository implementation.
//!
//! Listing queries join the `route` table so every returned group carries its
//! full path without a second round trip.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use tessera_core::{
    can_read_group, AccessLevel, Error, Group, GroupPolicy, GroupRepository, GroupScope,
    GroupSort, GroupSummary, ListGroupsRequest, Paginated, Result, User, Visibility,
};

use crate::escape_like;

const GROUP_COLUMNS: &str = r#"
    g.id, g.name, g.path, g.description, g.visibility_level, g.parent_id,
    g.created_at_utc, g.updated_at_utc,
    COALESCE(r.path, g.path) AS full_path,
    COALESCE(r.name, g.name) AS full_name,
    (SELECT COUNT(*) FROM namespace c WHERE c.parent_id = g.id) AS children_count,
    (SELECT m.access_level FROM group_member m WHERE m.group_id = g.id AND m.user_id = $1) AS access_level
"#;

/// ORDER BY clause for a sort key. Every clause ends on `g.id` so pages are
/// stable.
pub(crate) fn build_order_clause(sort: GroupSort) -> &'static str {
    match sort {
        GroupSort::IdDesc => "g.id DESC",
        GroupSort::IdAsc => "g.id ASC",
        GroupSort::NameAsc => "LOWER(g.name) ASC, g.id DESC",
        GroupSort::NameDesc => "LOWER(g.name) DESC, g.id DESC",
        GroupSort::CreatedDesc => "g.created_at_utc DESC, g.id DESC",
        GroupSort::CreatedAsc => "g.created_at_utc ASC, g.id DESC",
        GroupSort::LatestActivityDesc => "g.updated_at_utc DESC, g.id DESC",
        GroupSort::LatestActivityAsc => "g.updated_at_utc ASC, g.id DESC",
    }
}

/// WHERE clause for a scope. `$1` is always the viewer id; returns the clause
/// and the next free parameter index.
pub(crate) fn build_scope_clause(scope: &GroupScope) -> (&'static str, usize) {
    match scope {
        GroupScope::Memberships { .. } => (
            "AND EXISTS (SELECT 1 FROM group_member m WHERE m.group_id = g.id AND m.user_id = $1) ",
            2,
        ),
        // $2 = parent id, $3 = viewer reads everything below the parent
        GroupScope::Children { .. } => (
            "AND g.parent_id = $2 AND ($3 OR g.visibility_level >= 10 OR EXISTS (SELECT 1 FROM group_member m WHERE m.group_id = g.id AND m.user_id = $1)) ",
            4,
        ),
    }
}

/// Search clause matching name or path; binds the same parameter twice.
pub(crate) fn build_search_clause(param_idx: usize) -> String {
    format!(
        "AND (g.name ILIKE ${idx} ESCAPE '\\' OR g.path ILIKE ${idx} ESCAPE '\\') ",
        idx = param_idx
    )
}

fn map_group(row: &PgRow) -> Group {
    Group {
        id: row.get("id"),
        name: row.get("name"),
        path: row.get("path"),
        description: row.get("description"),
        visibility: Visibility::from_level(row.get("visibility_level")),
        parent_id: row.get("parent_id"),
        created_at_utc: row.get("created_at_utc"),
        updated_at_utc: row.get("updated_at_utc"),
    }
}

fn map_summary(row: PgRow) -> GroupSummary {
    let access_level: Option<i16> = row.get("access_level");
    GroupSummary {
        group: map_group(&row),
        full_path: row.get("full_path"),
        full_name: row.get("full_name"),
        children_count: row.get("children_count"),
        access_level: access_level.and_then(AccessLevel::from_value),
    }
}

/// PostgreSQL implementation of GroupRepository and GroupPolicy.
#[derive(Clone)]
pub struct PgGroupRepository {
    pool: Pool<Postgres>,
}

impl PgGroupRepository {
    /// Create a new PgGroupRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Create a group and its route. The route extends the parent's route.
    pub async fn create(
        &self,
        name: &str,
        path: &str,
        description: Option<&str>,
        visibility: Visibility,
        parent_id: Option<i64>,
    ) -> Result<Group> {
        if name.trim().is_empty() || path.trim().is_empty() {
            return Err(Error::InvalidInput(
                "group name and path are required".to_string(),
            ));
        }
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let parent_route: Option<(String, String)> = match parent_id {
            Some(pid) => {
                let row = sqlx::query("SELECT path, name FROM route WHERE source_id = $1")
                    .bind(pid)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(Error::Database)?
                    .ok_or(Error::GroupNotFound(pid))?;
                Some((row.get("path"), row.get("name")))
            }
            None => None,
        };

        let row = sqlx::query(
            "INSERT INTO namespace (name, path, description, visibility_level, parent_id, created_at_utc, updated_at_utc)
             VALUES ($1, $2, $3, $4, $5, $6, $6)
             RETURNING id, name, path, description, visibility_level, parent_id, created_at_utc, updated_at_utc",
        )
        .bind(name)
        .bind(path)
        .bind(description)
        .bind(visibility.level())
        .bind(parent_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;
        let group = map_group(&row);

        let (full_path, full_name) = match parent_route {
            Some((ppath, pname)) => (format!("{}/{}", ppath, path), format!("{} / {}", pname, name)),
            None => (path.to_string(), name.to_string()),
        };
        sqlx::query("INSERT INTO route (source_id, path, name) VALUES ($1, $2, $3)")
            .bind(group.id)
            .bind(&full_path)
            .bind(&full_name)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(group)
    }

    /// Add or change a user's membership in a group.
    pub async fn add_member(&self, group_id: i64, user_id: i64, level: AccessLevel) -> Result<()> {
        sqlx::query(
            "INSERT INTO group_member (group_id, user_id, access_level) VALUES ($1, $2, $3)
             ON CONFLICT (group_id, user_id) DO UPDATE SET access_level = EXCLUDED.access_level",
        )
        .bind(group_id)
        .bind(user_id)
        .bind(level.value())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// Whether `user_id` is a member of the group or any of its ancestors.
    pub async fn member_of_hierarchy(&self, group_id: i64, user_id: i64) -> Result<bool> {
        let is_member: bool = sqlx::query_scalar(
            r#"
            WITH RECURSIVE ancestors(id, parent_id) AS (
                SELECT id, parent_id FROM namespace WHERE id = $1
                UNION ALL
                SELECT n.id, n.parent_id FROM namespace n JOIN ancestors a ON n.id = a.parent_id
            )
            SELECT EXISTS (
                SELECT 1 FROM group_member m JOIN ancestors a ON m.group_id = a.id
                WHERE m.user_id = $2
            )
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(is_member)
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn find(&self, id: i64) -> Result<Option<Group>> {
        let row = sqlx::query(
            "SELECT g.id, g.name, g.path, g.description, g.visibility_level, g.parent_id,
                    g.created_at_utc, g.updated_at_utc
             FROM namespace g WHERE g.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(map_group))
    }

    async fn list(
        &self,
        scope: &GroupScope,
        req: &ListGroupsRequest,
    ) -> Result<Paginated<GroupSummary>> {
        let start = Instant::now();

        let (viewer_id, parent_id, reads_all_children) = match scope {
            GroupScope::Memberships { user_id } => (*user_id, None, false),
            GroupScope::Children { parent_id, viewer } => {
                // Membership anywhere above the children makes all of them readable.
                let inherited =
                    viewer.admin || self.member_of_hierarchy(*parent_id, viewer.id).await?;
                (viewer.id, Some(*parent_id), inherited)
            }
        };

        let (scope_clause, mut param_idx) = build_scope_clause(scope);
        let search = req
            .search_term()
            .map(|term| format!("%{}%", escape_like(term)));

        let mut where_clause = format!("WHERE TRUE {}", scope_clause);
        if search.is_some() {
            where_clause.push_str(&build_search_clause(param_idx));
            param_idx += 1;
        }

        // Both statements bind the same parameters in the same order.
        let count_sql = format!("SELECT COUNT(*) FROM namespace g {}", where_clause);
        let list_sql = format!(
            "SELECT {} FROM namespace g LEFT JOIN route r ON r.source_id = g.id {} ORDER BY {} LIMIT ${} OFFSET ${}",
            GROUP_COLUMNS,
            where_clause,
            build_order_clause(req.sort),
            param_idx,
            param_idx + 1
        );

        debug!(
            subsystem = "db",
            component = "groups",
            op = "list",
            user_id = viewer_id,
            parent_id = ?parent_id,
            sort = req.sort.as_str(),
            has_search = search.is_some(),
            "Listing groups"
        );

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(viewer_id);
        let mut list_query = sqlx::query(&list_sql).bind(viewer_id);
        if let Some(pid) = parent_id {
            count_query = count_query.bind(pid).bind(reads_all_children);
            list_query = list_query.bind(pid).bind(reads_all_children);
        }
        if let Some(pattern) = &search {
            count_query = count_query.bind(pattern.clone());
            list_query = list_query.bind(pattern.clone());
        }
        list_query = list_query.bind(req.page.limit()).bind(req.page.offset());

        let total = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        let rows = list_query
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let items: Vec<GroupSummary> = rows.into_iter().map(map_summary).collect();

        debug!(
            subsystem = "db",
            component = "groups",
            op = "list",
            result_count = items.len(),
            total = total,
            duration_ms = start.elapsed().as_millis() as u64,
            "Group listing complete"
        );

        Ok(Paginated {
            items,
            total,
            page: req.page,
        })
    }
}

#[async_trait]
impl GroupPolicy for PgGroupRepository {
    async fn can_read_group(&self, user: &User, group: &Group) -> Result<bool> {
        if can_read_group(Some(user), group, false) {
            return Ok(true);
        }
        let member = self.member_of_hierarchy(group.id, user.id).await?;
        Ok(can_read_group(Some(user), group, member))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_order_clause_ends_on_id() {
        for sort in GroupSort::ALL {
            let clause = build_order_clause(sort);
            assert!(
                clause.ends_with("g.id DESC") || clause.ends_with("g.id ASC"),
                "{} -> {}",
                sort,
                clause
            );
        }
    }

    #[test]
    fn test_default_order_is_id_desc() {
        assert_eq!(build_order_clause(GroupSort::default()), "g.id DESC");
    }

    #[test]
    fn test_scope_clause_parameter_numbering() {
        let (clause, next) = build_scope_clause(&GroupScope::Memberships { user_id: 1 });
        assert!(clause.contains("$1"));
        assert_eq!(next, 2);

        let viewer = User {
            id: 1,
            username: "u".to_string(),
            name: "U".to_string(),
            admin: false,
        };
        let (clause, next) = build_scope_clause(&GroupScope::Children {
            parent_id: 5,
            viewer,
        });
        assert!(clause.contains("$2") && clause.contains("$3"));
        assert_eq!(next, 4);
    }

    #[test]
    fn test_search_clause_uses_single_parameter() {
        let clause = build_search_clause(4);
        assert_eq!(clause.matches("$4").count(), 2);
        assert!(clause.contains("ILIKE"));
    }
}
