use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use bow_core::models::GovernanceItem;
use bow_core::query::GOVERNANCE_SORTS;

use super::listing::{Filter, Listing};

const COLUMNS: &str = "id, title, description, kind, status, review_frequency, last_reviewed, \
     next_review_date, owner_id, department_id, created_at, updated_at";

pub const LISTING: Listing = Listing {
    table: "governance_items",
    columns: COLUMNS,
    search: &["title", "description"],
    sorts: GOVERNANCE_SORTS,
    filters: &[Filter::Status, Filter::Owner],
    org_wide: true,
};

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<GovernanceItem>, sqlx::Error> {
    sqlx::query_as::<_, GovernanceItem>(&format!("SELECT {COLUMNS} FROM governance_items WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Items that are not retired, across all departments.
pub async fn current(pool: &PgPool) -> Result<Vec<GovernanceItem>, sqlx::Error> {
    sqlx::query_as::<_, GovernanceItem>(&format!(
        "SELECT {COLUMNS} FROM governance_items
         WHERE status <> 'retired'
         ORDER BY next_review_date NULLS LAST, id"
    ))
    .fetch_all(pool)
    .await
}

pub async fn insert<'e>(exec: impl PgExecutor<'e>, item: &GovernanceItem) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO governance_items (id, title, description, kind, status, review_frequency,
             last_reviewed, next_review_date, owner_id, department_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(item.id)
    .bind(&item.title)
    .bind(&item.description)
    .bind(item.kind)
    .bind(item.status)
    .bind(item.review_frequency)
    .bind(item.last_reviewed)
    .bind(item.next_review_date)
    .bind(item.owner_id)
    .bind(item.department_id)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn update(pool: &PgPool, item: &GovernanceItem) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE governance_items SET title = $2, description = $3, kind = $4, status = $5,
             review_frequency = $6, last_reviewed = $7, next_review_date = $8, owner_id = $9,
             department_id = $10, updated_at = $11
         WHERE id = $1",
    )
    .bind(item.id)
    .bind(&item.title)
    .bind(&item.description)
    .bind(item.kind)
    .bind(item.status)
    .bind(item.review_frequency)
    .bind(item.last_reviewed)
    .bind(item.next_review_date)
    .bind(item.owner_id)
    .bind(item.department_id)
    .bind(item.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM governance_items WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
