use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use bow_core::kanban::CardUpdate;
use bow_core::models::{WorkItem, WorkStatus};
use bow_core::query::WORK_ITEM_SORTS;

use super::listing::{Filter, Listing};

const COLUMNS: &str = "id, title, description, status, priority, department_id, team_id, owner_id, \
     assignee_id, start_date, due_date, completed_at, position, rag_override, created_at, updated_at";

/// `$2` is the department filter; NULL means every department.
const BOARD_SCOPE: &str = "($2::uuid IS NULL OR department_id = $2 OR department_id IS NULL)";

pub const LISTING: Listing = Listing {
    table: "work_items",
    columns: COLUMNS,
    search: &["title", "description"],
    sorts: WORK_ITEM_SORTS,
    filters: &[Filter::Status, Filter::Team, Filter::Assignee, Filter::Owner],
    org_wide: true,
};

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<WorkItem>, sqlx::Error> {
    sqlx::query_as::<_, WorkItem>(&format!("SELECT {COLUMNS} FROM work_items WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Open items across all departments, for scheduled reminders.
pub async fn open(pool: &PgPool) -> Result<Vec<WorkItem>, sqlx::Error> {
    sqlx::query_as::<_, WorkItem>(&format!(
        "SELECT {COLUMNS} FROM work_items WHERE status <> 'done' ORDER BY due_date NULLS LAST, id"
    ))
    .fetch_all(pool)
    .await
}

/// Cards in the given kanban columns that pass `department`, the caller's
/// `department_filter`. Organisation-wide cards are on every board.
pub async fn in_columns(
    pool: &PgPool,
    statuses: &[WorkStatus],
    department: Option<Uuid>,
) -> Result<Vec<WorkItem>, sqlx::Error> {
    let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
    sqlx::query_as::<_, WorkItem>(&format!(
        "SELECT {COLUMNS} FROM work_items
         WHERE status = ANY($1) AND {BOARD_SCOPE}
         ORDER BY position, created_at, id"
    ))
    .bind(statuses)
    .bind(department)
    .fetch_all(pool)
    .await
}

/// Position that puts a new card at the bottom of its column on the board
/// seen under `department`.
pub async fn next_position<'e>(
    exec: impl PgExecutor<'e>,
    status: WorkStatus,
    department: Option<Uuid>,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(&format!(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM work_items WHERE status = $1 AND {BOARD_SCOPE}"
    ))
    .bind(status)
    .bind(department)
    .fetch_one(exec)
    .await
}

pub async fn insert<'e>(exec: impl PgExecutor<'e>, item: &WorkItem) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO work_items (id, title, description, status, priority, department_id, team_id,
             owner_id, assignee_id, start_date, due_date, completed_at, position, rag_override,
             created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(item.id)
    .bind(&item.title)
    .bind(&item.description)
    .bind(item.status)
    .bind(item.priority)
    .bind(item.department_id)
    .bind(item.team_id)
    .bind(item.owner_id)
    .bind(item.assignee_id)
    .bind(item.start_date)
    .bind(item.due_date)
    .bind(item.completed_at)
    .bind(item.position)
    .bind(item.rag_override)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn update(pool: &PgPool, item: &WorkItem) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE work_items SET title = $2, description = $3, status = $4, priority = $5,
             department_id = $6, team_id = $7, owner_id = $8, assignee_id = $9, start_date = $10,
             due_date = $11, completed_at = $12, position = $13, rag_override = $14, updated_at = $15
         WHERE id = $1",
    )
    .bind(item.id)
    .bind(&item.title)
    .bind(&item.description)
    .bind(item.status)
    .bind(item.priority)
    .bind(item.department_id)
    .bind(item.team_id)
    .bind(item.owner_id)
    .bind(item.assignee_id)
    .bind(item.start_date)
    .bind(item.due_date)
    .bind(item.completed_at)
    .bind(item.position)
    .bind(item.rag_override)
    .bind(item.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Persist the placements produced by a kanban move.
pub async fn apply_moves(pool: &PgPool, updates: &[CardUpdate], now: DateTime<Utc>) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for card in updates {
        sqlx::query(
            "UPDATE work_items SET status = $2, position = $3, completed_at = $4, updated_at = $5
             WHERE id = $1",
        )
        .bind(card.id)
        .bind(card.status)
        .bind(card.position)
        .bind(card.completed_at)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM work_items WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
