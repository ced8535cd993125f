use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use bow_core::models::User;
use bow_core::query::USER_SORTS;

use super::listing::{Filter, Listing};

const COLUMNS: &str = "id, name, email, role, department_id, team_id, is_active, email_notifications, \
     last_login_at, created_at, updated_at";

pub const LISTING: Listing = Listing {
    table: "users",
    columns: COLUMNS,
    search: &["name", "email"],
    sorts: USER_SORTS,
    filters: &[Filter::Team],
    org_wide: false,
};

#[derive(sqlx::FromRow)]
struct Credentials {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// The account and its password hash, by normalised e-mail.
pub async fn find_credentials(pool: &PgPool, email: &str) -> Result<Option<(User, String)>, sqlx::Error> {
    let row = sqlx::query_as::<_, Credentials>(&format!(
        "SELECT {COLUMNS}, password_hash FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|c| (c.user, c.password_hash)))
}

pub async fn password_hash(pool: &PgPool, id: Uuid) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn active(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE is_active ORDER BY name"))
        .fetch_all(pool)
        .await
}

pub async fn team_members(pool: &PgPool, team_id: Uuid) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE team_id = $1 ORDER BY name"))
        .bind(team_id)
        .fetch_all(pool)
        .await
}

/// Map of lower-cased e-mail to user id for the given addresses.
pub async fn ids_by_email(pool: &PgPool, emails: &[String]) -> Result<Vec<(String, Uuid)>, sqlx::Error> {
    sqlx::query_as::<_, (String, Uuid)>("SELECT email, id FROM users WHERE email = ANY($1)")
        .bind(emails)
        .fetch_all(pool)
        .await
}

pub async fn insert<'e>(exec: impl PgExecutor<'e>, user: &User, password_hash: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, department_id, team_id, is_active,
             email_notifications, last_login_at, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(password_hash)
    .bind(user.role)
    .bind(user.department_id)
    .bind(user.team_id)
    .bind(user.is_active)
    .bind(user.email_notifications)
    .bind(user.last_login_at)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn update<'e>(exec: impl PgExecutor<'e>, user: &User) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET name = $2, email = $3, role = $4, department_id = $5, team_id = $6,
             is_active = $7, email_notifications = $8, updated_at = $9
         WHERE id = $1",
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(user.role)
    .bind(user.department_id)
    .bind(user.team_id)
    .bind(user.is_active)
    .bind(user.email_notifications)
    .bind(user.updated_at)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn set_password<'e>(
    exec: impl PgExecutor<'e>,
    id: Uuid,
    hash: &str,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
        .bind(id)
        .bind(hash)
        .bind(now)
        .execute(exec)
        .await?;
    Ok(())
}

/// Profile, optional new password hash and session revocation, all or nothing.
pub async fn save(
    pool: &PgPool,
    user: &User,
    password_hash: Option<&str>,
    revoke_sessions: bool,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    update(&mut *tx, user).await?;
    if let Some(hash) = password_hash {
        set_password(&mut *tx, user.id, hash, user.updated_at).await?;
    }
    if revoke_sessions {
        delete_tokens_except(&mut *tx, user.id, None).await?;
    }
    tx.commit().await
}

pub async fn touch_login(pool: &PgPool, id: Uuid, now: DateTime<Utc>) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1")
        .bind(id)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ── Tokens ───────────────────────────────────────────────────────

pub async fn insert_token(
    pool: &PgPool,
    token_hash: &str,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO api_tokens (token_hash, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(token_hash)
        .bind(user_id)
        .bind(expires_at)
        .execute(pool)
        .await?;
    Ok(())
}

/// The user behind an unexpired token, marking the token as used.
pub async fn user_for_token(pool: &PgPool, token_hash: &str, now: DateTime<Utc>) -> Result<Option<User>, sqlx::Error> {
    let user_id = sqlx::query_scalar::<_, Uuid>(
        "UPDATE api_tokens SET last_used_at = $2
         WHERE token_hash = $1 AND expires_at > $2
         RETURNING user_id",
    )
    .bind(token_hash)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    match user_id {
        Some(id) => find(pool, id).await,
        None => Ok(None),
    }
}

pub async fn delete_token(pool: &PgPool, token_hash: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM api_tokens WHERE token_hash = $1")
        .bind(token_hash)
        .execute(pool)
        .await?;
    Ok(())
}

/// Revoke every session of a user except, optionally, one.
pub async fn delete_tokens_except<'e>(
    exec: impl PgExecutor<'e>,
    user_id: Uuid,
    keep: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM api_tokens WHERE user_id = $1 AND ($2::text IS NULL OR token_hash <> $2)")
        .bind(user_id)
        .bind(keep)
        .execute(exec)
        .await?;
    Ok(())
}
