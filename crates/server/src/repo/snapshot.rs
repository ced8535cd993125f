use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Tables included in backups, parents before children. Login tokens are
/// left out; restored users sign in again.
pub const BACKUP_TABLES: &[&str] = &[
    "departments",
    "users",
    "teams",
    "work_items",
    "risks",
    "suppliers",
    "governance_items",
    "notifications",
    "job_runs",
];

/// Every row of every backed-up table as JSON objects.
pub async fn dump_tables(pool: &PgPool) -> Result<Vec<(String, Vec<serde_json::Value>)>, anyhow::Error> {
    let mut tables = Vec::with_capacity(BACKUP_TABLES.len());
    for table in BACKUP_TABLES {
        let rows = sqlx::query_scalar::<_, String>(&format!("SELECT to_jsonb(t)::text FROM {table} t ORDER BY t.id"))
            .fetch_all(pool)
            .await?;
        let rows = rows
            .iter()
            .map(|raw| serde_json::from_str(raw))
            .collect::<Result<Vec<serde_json::Value>, _>>()?;
        tables.push((table.to_string(), rows));
    }
    Ok(tables)
}

pub async fn record_job_run(
    pool: &PgPool,
    job: &str,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    summary: Option<&str>,
    error: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO job_runs (id, job, started_at, finished_at, success, summary, error)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(Uuid::new_v4())
    .bind(job)
    .bind(started_at)
    .bind(finished_at)
    .bind(error.is_none())
    .bind(summary)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(())
}
