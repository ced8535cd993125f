use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use bow_core::models::Supplier;
use bow_core::query::SUPPLIER_SORTS;

use super::listing::{Filter, Listing};

const COLUMNS: &str = "id, name, contact_name, contact_email, phone, category, criticality, status, \
     contract_start, contract_end, annual_value_cents, owner_id, department_id, notes, created_at, updated_at";

pub const LISTING: Listing = Listing {
    table: "suppliers",
    columns: COLUMNS,
    search: &["name", "contact_name", "category"],
    sorts: SUPPLIER_SORTS,
    filters: &[Filter::Status, Filter::Owner],
    org_wide: true,
};

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Supplier>, sqlx::Error> {
    sqlx::query_as::<_, Supplier>(&format!("SELECT {COLUMNS} FROM suppliers WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Suppliers with a contract end date that are still engaged.
pub async fn with_contracts(pool: &PgPool) -> Result<Vec<Supplier>, sqlx::Error> {
    sqlx::query_as::<_, Supplier>(&format!(
        "SELECT {COLUMNS} FROM suppliers
         WHERE contract_end IS NOT NULL AND status <> 'inactive'
         ORDER BY contract_end, id"
    ))
    .fetch_all(pool)
    .await
}

pub async fn insert<'e>(exec: impl PgExecutor<'e>, supplier: &Supplier) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO suppliers (id, name, contact_name, contact_email, phone, category, criticality,
             status, contract_start, contract_end, annual_value_cents, owner_id, department_id, notes,
             created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(supplier.id)
    .bind(&supplier.name)
    .bind(&supplier.contact_name)
    .bind(&supplier.contact_email)
    .bind(&supplier.phone)
    .bind(&supplier.category)
    .bind(supplier.criticality)
    .bind(supplier.status)
    .bind(supplier.contract_start)
    .bind(supplier.contract_end)
    .bind(supplier.annual_value_cents)
    .bind(supplier.owner_id)
    .bind(supplier.department_id)
    .bind(&supplier.notes)
    .bind(supplier.created_at)
    .bind(supplier.updated_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn update(pool: &PgPool, supplier: &Supplier) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE suppliers SET name = $2, contact_name = $3, contact_email = $4, phone = $5,
             category = $6, criticality = $7, status = $8, contract_start = $9, contract_end = $10,
             annual_value_cents = $11, owner_id = $12, department_id = $13, notes = $14,
             updated_at = $15
         WHERE id = $1",
    )
    .bind(supplier.id)
    .bind(&supplier.name)
    .bind(&supplier.contact_name)
    .bind(&supplier.contact_email)
    .bind(&supplier.phone)
    .bind(&supplier.category)
    .bind(supplier.criticality)
    .bind(supplier.status)
    .bind(supplier.contract_start)
    .bind(supplier.contract_end)
    .bind(supplier.annual_value_cents)
    .bind(supplier.owner_id)
    .bind(supplier.department_id)
    .bind(&supplier.notes)
    .bind(supplier.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM suppliers WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
