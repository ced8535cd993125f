use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use bow_core::config::PostgresConfig;

/// Open a pool without touching the schema.
pub async fn connect(config: &PostgresConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.connection_string())
        .await
        .with_context(|| format!("connecting to PostgreSQL at {}:{}", config.host, config.port))
}

pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .context("running database migrations")?;
    info!("Database migrations applied successfully");
    Ok(())
}

/// Create a PostgreSQL connection pool and run migrations.
/// Returns None if PostgreSQL is not configured or unreachable; every
/// data endpoint then answers 503.
pub async fn init_pg_pool(config: &PostgresConfig) -> Option<PgPool> {
    if !config.is_configured() {
        warn!("PG_HOST not configured, data endpoints disabled");
        return None;
    }

    match connect(config).await {
        Ok(pool) => {
            info!("PostgreSQL connected: {}", config.host);
            match migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    warn!("{e:#}, data endpoints disabled");
                    None
                }
            }
        }
        Err(e) => {
            warn!("{e:#}, data endpoints disabled");
            None
        }
    }
}

pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error().is_some_and(|db| db.is_unique_violation())
}

/// Column behind a violated `{table}_{column}_fkey` constraint.
pub fn foreign_key_column(e: &sqlx::Error) -> Option<String> {
    let db = e.as_database_error()?;
    if !db.is_foreign_key_violation() {
        return None;
    }
    let constraint = db.constraint()?;
    let column = match db.table() {
        Some(table) => constraint.strip_prefix(table)?.strip_prefix('_')?,
        None => constraint,
    };
    Some(column.strip_suffix("_fkey").unwrap_or(column).to_string())
}
