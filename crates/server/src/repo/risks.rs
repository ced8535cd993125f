use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use bow_core::models::Risk;
use bow_core::query::RISK_SORTS;

use super::listing::{Filter, Listing};

const COLUMNS: &str = "id, title, description, category, likelihood, impact, status, owner_id, \
     department_id, mitigation, review_date, created_at, updated_at";

pub const LISTING: Listing = Listing {
    table: "risks",
    columns: COLUMNS,
    search: &["title", "description", "category"],
    sorts: RISK_SORTS,
    filters: &[Filter::Status, Filter::Owner],
    org_wide: true,
};

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Risk>, sqlx::Error> {
    sqlx::query_as::<_, Risk>(&format!("SELECT {COLUMNS} FROM risks WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Risks that are not closed, across all departments.
pub async fn open(pool: &PgPool) -> Result<Vec<Risk>, sqlx::Error> {
    sqlx::query_as::<_, Risk>(&format!(
        "SELECT {COLUMNS} FROM risks WHERE status <> 'closed' ORDER BY review_date NULLS LAST, id"
    ))
    .fetch_all(pool)
    .await
}

pub async fn insert<'e>(exec: impl PgExecutor<'e>, risk: &Risk) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO risks (id, title, description, category, likelihood, impact, status, owner_id,
             department_id, mitigation, review_date, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(risk.id)
    .bind(&risk.title)
    .bind(&risk.description)
    .bind(&risk.category)
    .bind(risk.likelihood)
    .bind(risk.impact)
    .bind(risk.status)
    .bind(risk.owner_id)
    .bind(risk.department_id)
    .bind(&risk.mitigation)
    .bind(risk.review_date)
    .bind(risk.created_at)
    .bind(risk.updated_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn update(pool: &PgPool, risk: &Risk) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE risks SET title = $2, description = $3, category = $4, likelihood = $5, impact = $6,
             status = $7, owner_id = $8, department_id = $9, mitigation = $10, review_date = $11,
             updated_at = $12
         WHERE id = $1",
    )
    .bind(risk.id)
    .bind(&risk.title)
    .bind(&risk.description)
    .bind(&risk.category)
    .bind(risk.likelihood)
    .bind(risk.impact)
    .bind(risk.status)
    .bind(risk.owner_id)
    .bind(risk.department_id)
    .bind(&risk.mitigation)
    .bind(risk.review_date)
    .bind(risk.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM risks WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
