//! List query parameters, sort whitelists and paginated responses.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::Rag;

pub const DEFAULT_PER_PAGE: u32 = 25;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// 1-based page number.
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub sort: Option<String>,
    pub direction: Option<SortDirection>,
    /// Case-insensitive substring match on title/name.
    pub search: Option<String>,
    pub status: Option<String>,
    pub team_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub rag: Option<Rag>,
}

/// Sort key exposed to clients and the SQL expression it orders by.
pub type SortColumn = (&'static str, &'static str);

const PRIORITY_ORDER: &str =
    "CASE priority WHEN 'low' THEN 0 WHEN 'medium' THEN 1 WHEN 'high' THEN 2 ELSE 3 END";
const CRITICALITY_ORDER: &str =
    "CASE criticality WHEN 'low' THEN 0 WHEN 'medium' THEN 1 WHEN 'high' THEN 2 ELSE 3 END";

pub const WORK_ITEM_SORTS: &[SortColumn] = &[
    ("title", "title"),
    ("status", "status"),
    ("priority", PRIORITY_ORDER),
    ("start_date", "start_date"),
    ("due_date", "due_date"),
    ("position", "position"),
    ("created_at", "created_at"),
    ("updated_at", "updated_at"),
];

pub const RISK_SORTS: &[SortColumn] = &[
    ("title", "title"),
    ("category", "category"),
    ("likelihood", "likelihood"),
    ("impact", "impact"),
    ("score", "(likelihood * impact)"),
    ("status", "status"),
    ("review_date", "review_date"),
    ("created_at", "created_at"),
    ("updated_at", "updated_at"),
];

pub const SUPPLIER_SORTS: &[SortColumn] = &[
    ("name", "name"),
    ("category", "category"),
    ("criticality", CRITICALITY_ORDER),
    ("status", "status"),
    ("contract_end", "contract_end"),
    ("annual_value_cents", "annual_value_cents"),
    ("created_at", "created_at"),
    ("updated_at", "updated_at"),
];

pub const GOVERNANCE_SORTS: &[SortColumn] = &[
    ("title", "title"),
    ("kind", "kind"),
    ("status", "status"),
    ("last_reviewed", "last_reviewed"),
    ("next_review_date", "next_review_date"),
    ("created_at", "created_at"),
    ("updated_at", "updated_at"),
];

pub const USER_SORTS: &[SortColumn] = &[
    ("name", "name"),
    ("email", "email"),
    ("role", "role"),
    ("last_login_at", "last_login_at"),
    ("created_at", "created_at"),
];

pub const TEAM_SORTS: &[SortColumn] = &[("name", "name"), ("created_at", "created_at")];

/// A resolved, whitelisted ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub expr: &'static str,
    pub direction: SortDirection,
}

impl Sort {
    /// `ORDER BY` body, with `id` as a stable tie-breaker.
    pub fn to_sql(&self) -> String {
        format!("{} {} NULLS LAST, id ASC", self.expr, self.direction.as_sql())
    }
}

impl ListParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.per_page())
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page())
    }

    /// Resolve the requested sort against a whitelist. Unknown keys fall back
    /// to newest first.
    pub fn sort(&self, columns: &[SortColumn]) -> Sort {
        let requested = self
            .sort
            .as_deref()
            .and_then(|key| columns.iter().find(|(name, _)| *name == key.trim()));
        match requested {
            Some((_, expr)) => Sort {
                expr,
                direction: self.direction.unwrap_or(SortDirection::Asc),
            },
            None => Sort {
                expr: "created_at",
                direction: SortDirection::Desc,
            },
        }
    }

    /// `ILIKE` pattern for the search term with wildcards escaped.
    pub fn search_pattern(&self) -> Option<String> {
        let term = self.search.as_deref()?.trim();
        if term.is_empty() {
            return None;
        }
        let escaped = term
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        Some(format!("%{escaped}%"))
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PageMeta {
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub last_page: u32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, params: &ListParams) -> Self {
        let per_page = params.per_page();
        let pages = (total.max(0) as u64).div_ceil(u64::from(per_page));
        Self {
            data,
            meta: PageMeta {
                page: params.page(),
                per_page,
                total,
                last_page: u32::try_from(pages).unwrap_or(u32::MAX).max(1),
            },
        }
    }

    /// Paginate an already filtered and sorted collection in memory.
    pub fn from_vec(all: Vec<T>, params: &ListParams) -> Self {
        let total = all.len() as i64;
        let data = all
            .into_iter()
            .skip(params.offset() as usize)
            .take(params.per_page() as usize)
            .collect();
        Self::new(data, total, params)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_defaults_and_clamps() {
        let params = ListParams::default();
        assert_eq!((params.page(), params.per_page(), params.offset()), (1, 25, 0));

        let params = ListParams { page: Some(0), per_page: Some(500), ..Default::default() };
        assert_eq!((params.page(), params.per_page()), (1, 100));

        let params = ListParams { page: Some(3), per_page: Some(10), ..Default::default() };
        assert_eq!(params.offset(), 20);
    }

    #[test]
    fn unknown_sort_falls_back_to_newest() {
        let params = ListParams {
            sort: Some("password_hash".into()),
            direction: Some(SortDirection::Asc),
            ..Default::default()
        };
        assert_eq!(params.sort(WORK_ITEM_SORTS).to_sql(), "created_at DESC NULLS LAST, id ASC");

        let params = ListParams { sort: Some("score".into()), direction: Some(SortDirection::Desc), ..Default::default() };
        assert_eq!(params.sort(RISK_SORTS).expr, "(likelihood * impact)");
    }

    #[test]
    fn search_escapes_wildcards() {
        let params = ListParams { search: Some(" 100%_done ".into()), ..Default::default() };
        assert_eq!(params.search_pattern().as_deref(), Some("%100\\%\\_done%"));
        let blank = ListParams { search: Some("  ".into()), ..Default::default() };
        assert_eq!(blank.search_pattern(), None);
    }

    #[test]
    fn in_memory_pages() {
        let params = ListParams { page: Some(2), per_page: Some(2), ..Default::default() };
        let page = Page::from_vec(vec![1, 2, 3, 4, 5], &params);
        assert_eq!(page.data, vec![3, 4]);
        assert_eq!(page.meta.total, 5);
        assert_eq!(page.meta.last_page, 3);

        let empty: Page<i32> = Page::from_vec(vec![], &ListParams::default());
        assert_eq!(empty.meta.last_page, 1);
    }
}
