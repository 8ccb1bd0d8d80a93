//! Representations of the dashboard group listing.

use serde::Serialize;

use tessera_core::markdown::escape_html;
use tessera_core::{GroupSort, GroupSummary, Paginated};

/// JSON shape of one group in the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupChild {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub full_name: String,
    pub full_path: String,
    pub description: String,
    pub visibility: &'static str,
    pub parent_id: Option<i64>,
    pub relative_path: String,
    pub children_count: i64,
    pub permission: Option<&'static str>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&GroupSummary> for GroupChild {
    fn from(summary: &GroupSummary) -> Self {
        let group = &summary.group;
        Self {
            id: group.id,
            kind: "group",
            name: group.name.clone(),
            full_name: summary.full_name.clone(),
            full_path: summary.full_path.clone(),
            description: group.description.clone().unwrap_or_default(),
            visibility: group.visibility.as_str(),
            parent_id: group.parent_id,
            relative_path: format!("/{}", summary.full_path),
            children_count: summary.children_count,
            permission: summary.access_level.map(|level| level.human_name()),
            created_at: group.created_at_utc.to_rfc3339(),
            updated_at: group.updated_at_utc.to_rfc3339(),
        }
    }
}

pub fn group_children(page: &Paginated<GroupSummary>) -> Vec<GroupChild> {
    page.items.iter().map(GroupChild::from).collect()
}

fn sort_label(sort: GroupSort) -> &'static str {
    match sort {
        GroupSort::IdDesc => "Last created",
        GroupSort::IdAsc => "Oldest created",
        GroupSort::NameAsc => "Name",
        GroupSort::NameDesc => "Name, descending",
        GroupSort::CreatedDesc => "Created date",
        GroupSort::CreatedAsc => "Created date, ascending",
        GroupSort::LatestActivityDesc => "Last updated",
        GroupSort::LatestActivityAsc => "Oldest updated",
    }
}

/// Everything the HTML page needs besides the groups themselves.
pub struct GroupsPage<'a> {
    pub filter: Option<&'a str>,
    pub sort: GroupSort,
    /// Builds the URL of another page of this listing.
    pub page_url: &'a dyn Fn(u32) -> String,
}

/// Full HTML page for the dashboard group listing.
pub fn render_groups_page(page: &Paginated<GroupSummary>, ctx: &GroupsPage<'_>) -> String {
    let mut html = String::with_capacity(1024 + page.items.len() * 256);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Groups · Dashboard</title>\n</head>\n<body>\n");
    html.push_str("<main class=\"dashboard-groups\">\n<h1>Groups</h1>\n");

    html.push_str("<form class=\"group-filter-form\" method=\"get\" action=\"/dashboard/groups\">\n");
    html.push_str(&format!(
        "<input type=\"search\" name=\"filter\" placeholder=\"Filter by name...\" value=\"{}\">\n",
        escape_html(ctx.filter.unwrap_or_default())
    ));
    html.push_str("<select name=\"sort\">\n");
    for sort in GroupSort::ALL {
        let selected = if sort == ctx.sort { " selected" } else { "" };
        html.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>\n",
            sort.as_str(),
            selected,
            sort_label(sort)
        ));
    }
    html.push_str("</select>\n</form>\n");

    if page.is_empty() {
        html.push_str("<p class=\"nothing-here-block\">No groups found</p>\n");
    } else {
        html.push_str("<ul class=\"groups-list content-list\">\n");
        for summary in &page.items {
            html.push_str(&render_group_row(summary));
        }
        html.push_str("</ul>\n");
    }

    html.push_str(&render_pagination(page, ctx.page_url));
    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn render_group_row(summary: &GroupSummary) -> String {
    let group = &summary.group;
    let mut row = format!(
        "<li class=\"group-row\" id=\"group-{}\">\n<a class=\"group-name\" href=\"/{}\">{}</a>\n",
        group.id,
        escape_html(&summary.full_path),
        escape_html(&summary.full_name)
    );
    row.push_str(&format!(
        "<span class=\"visibility\">{}</span>\n",
        group.visibility.as_str()
    ));
    if let Some(level) = summary.access_level {
        row.push_str(&format!(
            "<span class=\"user-access-role\">{}</span>\n",
            level.human_name()
        ));
    }
    if summary.children_count > 0 {
        row.push_str(&format!(
            "<a class=\"subgroups\" href=\"/dashboard/groups?parent_id={}\">{} subgroups</a>\n",
            group.id, summary.children_count
        ));
    }
    if let Some(description) = group.description.as_deref().filter(|d| !d.is_empty()) {
        row.push_str(&format!(
            "<p class=\"description\">{}</p>\n",
            escape_html(description)
        ));
    }
    row.push_str("</li>\n");
    row
}

fn render_pagination(page: &Paginated<GroupSummary>, page_url: &dyn Fn(u32) -> String) -> String {
    if page.total_pages() <= 1 {
        return String::new();
    }
    let mut nav = String::from("<nav class=\"pagination\">\n");
    if let Some(prev) = page.prev_page() {
        nav.push_str(&format!(
            "<a rel=\"prev\" href=\"{}\">Prev</a>\n",
            escape_html(&page_url(prev))
        ));
    }
    nav.push_str(&format!(
        "<span class=\"page\">{} / {}</span>\n",
        page.page.page,
        page.total_pages()
    ));
    if let Some(next) = page.next_page() {
        nav.push_str(&format!(
            "<a rel=\"next\" href=\"{}\">Next</a>\n",
            escape_html(&page_url(next))
        ));
    }
    nav.push_str("</nav>\n");
    nav
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tessera_core::{AccessLevel, Group, PageRequest, Visibility};

    fn summary(id: i64, name: &str) -> GroupSummary {
        GroupSummary {
            group: Group {
                id,
                name: name.to_string(),
                path: name.to_lowercase(),
                description: Some("<b>bold</b>".to_string()),
                visibility: Visibility::Internal,
                parent_id: Some(1),
                created_at_utc: Utc::now(),
                updated_at_utc: Utc::now(),
            },
            full_path: format!("acme/{}", name.to_lowercase()),
            full_name: format!("Acme / {}", name),
            children_count: 2,
            access_level: Some(AccessLevel::Maintainer),
        }
    }

    #[test]
    fn test_group_child_json_shape() {
        let child = GroupChild::from(&summary(5, "Infra"));
        let value = serde_json::to_value(&child).unwrap();
        assert_eq!(value["id"], 5);
        assert_eq!(value["type"], "group");
        assert_eq!(value["full_path"], "acme/infra");
        assert_eq!(value["relative_path"], "/acme/infra");
        assert_eq!(value["visibility"], "internal");
        assert_eq!(value["permission"], "Maintainer");
        assert_eq!(value["children_count"], 2);
    }

    #[test]
    fn test_html_page_escapes_and_paginates() {
        let page = Paginated {
            items: vec![summary(5, "Infra")],
            total: 3,
            page: PageRequest::new(Some(2), Some(1), 20),
        };
        let url = |n: u32| format!("/dashboard/groups?page={}&sort=name_asc", n);
        let html = render_groups_page(
            &page,
            &GroupsPage {
                filter: Some("<x>"),
                sort: GroupSort::NameAsc,
                page_url: &url,
            },
        );
        assert!(html.contains("Acme / Infra"));
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt;"));
        assert!(html.contains("value=\"&lt;x&gt;\""));
        assert!(html.contains("<option value=\"name_asc\" selected>"));
        assert!(html.contains("rel=\"prev\" href=\"/dashboard/groups?page=1&amp;sort=name_asc\""));
        assert!(html.contains("rel=\"next\""));
        assert!(html.contains("2 / 3"));
    }

    #[test]
    fn test_html_empty_listing() {
        let page: Paginated<GroupSummary> = Paginated::empty(PageRequest::default());
        let url = |n: u32| format!("?page={}", n);
        let html = render_groups_page(
            &page,
            &GroupsPage {
                filter: None,
                sort: GroupSort::IdDesc,
                page_url: &url,
            },
        );
        assert!(html.contains("No groups found"));
        assert!(!html.contains("class=\"pagination\""));
    }
}
