//! Query and body types for the HTTP endpoints.
//!
//! Numeric query parameters are parsed leniently: a value that is not an
//! integer is treated as absent instead of failing the request, matching how
//! the listing treats out-of-range page numbers.

use serde::{Deserialize, Deserializer};

use tessera_core::{GroupSort, ListGroupsRequest, PageRequest};

use crate::services::ListGroupsParams;

/// Integer query parameter that degrades to `None` when unparsable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LenientI64(pub Option<i64>);

impl LenientI64 {
    pub fn get(self) -> Option<i64> {
        self.0
    }
}

impl<'de> Deserialize<'de> for LenientI64 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(LenientI64(s.trim().parse().ok()))
    }
}

/// Query string of `GET /dashboard/groups`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListGroupsQuery {
    /// Kept raw: any supplied value, even one that is not an id, selects
    /// parent scoping.
    pub parent_id: Option<String>,
    pub filter: Option<String>,
    pub sort: Option<String>,
    #[serde(default)]
    pub page: LenientI64,
    #[serde(default)]
    pub per_page: LenientI64,
    pub format: Option<String>,
}

impl ListGroupsQuery {
    pub fn to_params(&self, default_per_page: u32) -> ListGroupsParams {
        ListGroupsParams {
            parent_id: self.parent_id.clone(),
            request: ListGroupsRequest {
                filter: self.filter.clone(),
                sort: GroupSort::parse(self.sort.as_deref()),
                page: PageRequest::new(self.page.get(), self.per_page.get(), default_per_page),
            },
        }
    }

    pub fn format_is_json(&self) -> bool {
        self.format.as_deref() == Some("json")
    }
}

/// Query string of the notes polling endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PollQuery {
    /// Unix seconds of the previous poll; absent means "everything".
    #[serde(default)]
    pub last_fetched_at: LenientI64,
}

/// Body of `POST /noteables/{type}/{id}/notes`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNoteBody {
    pub note: String,
    #[serde(default)]
    pub discussion_id: Option<String>,
}

/// Body of `PUT /notes/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateNoteBody {
    pub note: String,
}
