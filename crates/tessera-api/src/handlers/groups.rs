//! `GET /dashboard/groups[.json]`

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;

use tessera_core::{GroupSummary, Paginated};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::query_types::ListGroupsQuery;
use crate::state::AppState;
use crate::views::{group_children, render_groups_page, GroupsPage};

/// HTML by default; JSON when `format=json` or the `Accept` header prefers it.
pub async fn list_groups(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<ListGroupsQuery>,
) -> Result<Response, ApiError> {
    let json = query.format_is_json() || prefers_json(&headers);
    respond(state, user, uri, query, json).await
}

/// The `.json` variant of the listing.
pub async fn list_groups_json(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    uri: Uri,
    Query(query): Query<ListGroupsQuery>,
) -> Result<Response, ApiError> {
    respond(state, user, uri, query, true).await
}

async fn respond(
    state: AppState,
    user: tessera_core::User,
    uri: Uri,
    query: ListGroupsQuery,
    json: bool,
) -> Result<Response, ApiError> {
    let params = query.to_params(state.config.groups_per_page);
    let page = state.groups.list(&user, &params).await?;

    let path = uri.path().to_string();
    let raw_query = uri.query().unwrap_or_default().to_string();
    let url_for = move |n: u32| page_url(&path, &raw_query, n);

    if json {
        let mut response = Json(group_children(&page)).into_response();
        apply_pagination_headers(response.headers_mut(), &page, &url_for);
        Ok(response)
    } else {
        let html = render_groups_page(
            &page,
            &GroupsPage {
                filter: params.request.search_term(),
                sort: params.request.sort,
                page_url: &url_for,
            },
        );
        Ok((StatusCode::OK, Html(html)).into_response())
    }
}

/// Whether the first recognized media type in `Accept` is JSON.
pub fn prefers_json(headers: &HeaderMap) -> bool {
    let Some(accept) = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    accept
        .split(',')
        .map(|part| part.split(';').next().unwrap_or_default().trim())
        .find(|media| *media == "application/json" || *media == "text/html")
        .map(|media| media == "application/json")
        .unwrap_or(false)
}

/// URL of page `page` of the current listing, keeping every other parameter.
pub fn page_url(path: &str, raw_query: &str, page: u32) -> String {
    let mut pairs: Vec<&str> = raw_query
        .split('&')
        .filter(|pair| !pair.is_empty() && !pair.starts_with("page="))
        .collect();
    let page_pair = format!("page={}", page);
    pairs.push(&page_pair);
    format!("{}?{}", path, pairs.join("&"))
}

const X_TOTAL: HeaderName = HeaderName::from_static("x-total");
const X_TOTAL_PAGES: HeaderName = HeaderName::from_static("x-total-pages");
const X_PER_PAGE: HeaderName = HeaderName::from_static("x-per-page");
const X_PAGE: HeaderName = HeaderName::from_static("x-page");
const X_NEXT_PAGE: HeaderName = HeaderName::from_static("x-next-page");
const X_PREV_PAGE: HeaderName = HeaderName::from_static("x-prev-page");

fn number_header(n: impl ToString) -> HeaderValue {
    HeaderValue::from_str(&n.to_string()).unwrap_or_else(|_| HeaderValue::from_static(""))
}

fn optional_header(n: Option<u32>) -> HeaderValue {
    n.map(number_header)
        .unwrap_or_else(|| HeaderValue::from_static(""))
}

/// Set the `X-*` pagination headers and the `Link` header.
pub fn apply_pagination_headers(
    headers: &mut HeaderMap,
    page: &Paginated<GroupSummary>,
    page_url: &dyn Fn(u32) -> String,
) {
    let total_pages = page.total_pages();
    headers.insert(X_TOTAL, number_header(page.total));
    headers.insert(X_TOTAL_PAGES, number_header(total_pages));
    headers.insert(X_PER_PAGE, number_header(page.page.per_page));
    headers.insert(X_PAGE, number_header(page.page.page));
    headers.insert(X_NEXT_PAGE, optional_header(page.next_page()));
    headers.insert(X_PREV_PAGE, optional_header(page.prev_page()));

    let mut links = vec![format!("<{}>; rel=\"first\"", page_url(1))];
    if let Some(prev) = page.prev_page() {
        links.push(format!("<{}>; rel=\"prev\"", page_url(prev)));
    }
    if let Some(next) = page.next_page() {
        links.push(format!("<{}>; rel=\"next\"", page_url(next)));
    }
    links.push(format!("<{}>; rel=\"last\"", page_url(total_pages)));

    if let Ok(value) = HeaderValue::from_str(&links.join(", ")) {
        headers.insert(header::LINK, value);
    }
}
