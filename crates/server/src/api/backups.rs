//! Database snapshots. Admin only.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::info;

use bow_core::{authorize, Action, RecordScope, Resource};
use bow_storage::BackupEntry;

use crate::auth::AuthUser;
use crate::jobs::{self, BackupOutcome};
use crate::state::AppState;

use super::common::{denied, internal_error, require_pg, unavailable, ApiResult};

#[utoipa::path(
    get,
    path = "/api/backups",
    tag = "Backups",
    responses(
        (status = 200, description = "Stored snapshots, newest first"),
        (status = 403, description = "Admins only"),
        (status = 503, description = "Backup storage not configured")
    )
)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
) -> ApiResult<Json<Vec<BackupEntry>>> {
    authorize(&user, Action::View, Resource::Backup, &RecordScope::default())
        .map_err(|d| denied(d, "Backup", None))?;
    let store = state
        .backups
        .as_ref()
        .ok_or_else(|| unavailable("Backup storage not configured"))?;
    let entries = store.list().await.map_err(internal_error)?;
    Ok(Json(entries))
}

#[utoipa::path(
    post,
    path = "/api/backups",
    tag = "Backups",
    responses(
        (status = 201, description = "Snapshot written and retention applied"),
        (status = 403, description = "Admins only"),
        (status = 503, description = "Database or backup storage not configured")
    )
)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
) -> ApiResult<(StatusCode, Json<BackupOutcome>)> {
    authorize(&user, Action::Create, Resource::Backup, &RecordScope::default())
        .map_err(|d| denied(d, "Backup", None))?;
    require_pg(&state)?;
    if state.backups.is_none() {
        return Err(unavailable("Backup storage not configured"));
    }

    let outcome = jobs::create_backup(&state, Utc::now())
        .await
        .map_err(|e| internal_error(format!("{e:#}")))?;
    info!(name = %outcome.backup.name, user_id = %user.id, "manual backup created");
    Ok((StatusCode::CREATED, Json(outcome)))
}
