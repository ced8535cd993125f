//! Filtered, sorted and paginated SELECTs shared by the list endpoints.

use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use bow_core::models::enums::normalize_variant;
use bow_core::query::{ListParams, SortColumn};

/// A `ListParams` field that maps onto an equality filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Status,
    Team,
    Assignee,
    Owner,
}

/// Table-specific parts of a list query.
pub struct Listing {
    pub table: &'static str,
    pub columns: &'static str,
    /// Columns matched by `?search=`.
    pub search: &'static [&'static str],
    pub sorts: &'static [SortColumn],
    pub filters: &'static [Filter],
    /// Whether rows without a department are visible to everyone.
    pub org_wide: bool,
}

impl Listing {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>, params: &ListParams, department: Option<Uuid>) {
        qb.push(" WHERE TRUE");

        if let Some(department_id) = department {
            qb.push(" AND (department_id = ").push_bind(department_id);
            if self.org_wide {
                qb.push(" OR department_id IS NULL");
            }
            qb.push(")");
        }

        if let Some(pattern) = params.search_pattern() {
            qb.push(" AND (");
            for (i, column) in self.search.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(*column).push(" ILIKE ").push_bind(pattern.clone());
            }
            qb.push(")");
        }

        for filter in self.filters {
            match filter {
                Filter::Status => {
                    if let Some(status) = params.status.as_deref().filter(|s| !s.trim().is_empty()) {
                        qb.push(" AND status = ").push_bind(normalize_variant(status));
                    }
                }
                Filter::Team => {
                    if let Some(id) = params.team_id {
                        qb.push(" AND team_id = ").push_bind(id);
                    }
                }
                Filter::Assignee => {
                    if let Some(id) = params.assignee_id {
                        qb.push(" AND assignee_id = ").push_bind(id);
                    }
                }
                Filter::Owner => {
                    if let Some(id) = params.owner_id {
                        qb.push(" AND owner_id = ").push_bind(id);
                    }
                }
            }
        }
    }

    fn select(&self, params: &ListParams, department: Option<Uuid>) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM {}", self.columns, self.table));
        self.push_where(&mut qb, params, department);
        qb.push(" ORDER BY ").push(params.sort(self.sorts).to_sql());
        qb
    }

    /// One page of matching rows plus the total match count.
    pub async fn fetch_page<T>(
        &self,
        pool: &PgPool,
        params: &ListParams,
        department: Option<Uuid>,
    ) -> Result<(Vec<T>, i64), sqlx::Error>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut count = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", self.table));
        self.push_where(&mut count, params, department);
        let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

        let mut select = self.select(params, department);
        select
            .push(" LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());
        let rows = select.build_query_as::<T>().fetch_all(pool).await?;
        Ok((rows, total))
    }

    /// Every matching row, sorted, for in-memory filtering and exports.
    pub async fn fetch_all<T>(
        &self,
        pool: &PgPool,
        params: &ListParams,
        department: Option<Uuid>,
    ) -> Result<Vec<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        self.select(params, department).build_query_as::<T>().fetch_all(pool).await
    }
}
