//! Departments and teams.

use sqlx::PgPool;
use uuid::Uuid;

use bow_core::models::{Department, Team};
use bow_core::query::TEAM_SORTS;

use super::listing::Listing;

// ── Departments ──────────────────────────────────────────────────

pub async fn list_departments(pool: &PgPool, only: Option<Uuid>) -> Result<Vec<Department>, sqlx::Error> {
    sqlx::query_as::<_, Department>(
        "SELECT id, name, created_at, updated_at FROM departments
         WHERE ($1::uuid IS NULL OR id = $1)
         ORDER BY name",
    )
    .bind(only)
    .fetch_all(pool)
    .await
}

pub async fn find_department(pool: &PgPool, id: Uuid) -> Result<Option<Department>, sqlx::Error> {
    sqlx::query_as::<_, Department>("SELECT id, name, created_at, updated_at FROM departments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_department(pool: &PgPool, department: &Department) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO departments (id, name, created_at, updated_at) VALUES ($1, $2, $3, $4)")
        .bind(department.id)
        .bind(&department.name)
        .bind(department.created_at)
        .bind(department.updated_at)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_department(pool: &PgPool, department: &Department) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE departments SET name = $2, updated_at = $3 WHERE id = $1")
        .bind(department.id)
        .bind(&department.name)
        .bind(department.updated_at)
        .execute(pool)
        .await?;
    Ok(())
}

/// Teams and users still attached to a department.
pub async fn department_dependents(pool: &PgPool, id: Uuid) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as::<_, (i64, i64)>(
        "SELECT (SELECT COUNT(*) FROM teams WHERE department_id = $1),
                (SELECT COUNT(*) FROM users WHERE department_id = $1)",
    )
    .bind(id)
    .fetch_one(pool)
    .await
}

pub async fn delete_department(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM departments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ── Teams ────────────────────────────────────────────────────────

const TEAM_COLUMNS: &str = "id, name, department_id, lead_id, description, created_at, updated_at";

pub const TEAM_LISTING: Listing = Listing {
    table: "teams",
    columns: TEAM_COLUMNS,
    search: &["name", "description"],
    sorts: TEAM_SORTS,
    filters: &[],
    org_wide: false,
};

pub async fn all_teams(pool: &PgPool, department: Option<Uuid>) -> Result<Vec<Team>, sqlx::Error> {
    sqlx::query_as::<_, Team>(&format!(
        "SELECT {TEAM_COLUMNS} FROM teams
         WHERE ($1::uuid IS NULL OR department_id = $1)
         ORDER BY name"
    ))
    .bind(department)
    .fetch_all(pool)
    .await
}

pub async fn find_team(pool: &PgPool, id: Uuid) -> Result<Option<Team>, sqlx::Error> {
    sqlx::query_as::<_, Team>(&format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_team(pool: &PgPool, team: &Team) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO teams (id, name, department_id, lead_id, description, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(team.id)
    .bind(&team.name)
    .bind(team.department_id)
    .bind(team.lead_id)
    .bind(&team.description)
    .bind(team.created_at)
    .bind(team.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_team(pool: &PgPool, team: &Team) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE teams SET name = $2, department_id = $3, lead_id = $4, description = $5, updated_at = $6
         WHERE id = $1",
    )
    .bind(team.id)
    .bind(&team.name)
    .bind(team.department_id)
    .bind(team.lead_id)
    .bind(&team.description)
    .bind(team.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_team(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM teams WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
