//! The caller's in-app notifications.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use bow_core::models::Notification;
use bow_core::query::{ListParams, Page};

use crate::auth::AuthUser;
use crate::repo;
use crate::state::AppState;

use super::common::{internal_error, not_found, require_pg, ApiResult};

const RESOURCE: &str = "Notification";

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Only unread notifications when true.
    #[serde(default)]
    pub unread: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCount {
    pub unread: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkedRead {
    pub updated: u64,
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    params(NotificationQuery),
    responses((status = 200, description = "Newest first", body = Page<Notification>))
)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Json<Page<Notification>>> {
    let pool = require_pg(&state)?;
    let params = ListParams {
        page: query.page,
        per_page: query.per_page,
        ..Default::default()
    };
    let (rows, total) =
        repo::notifications::list_for_user(pool, user.id, query.unread, params.limit(), params.offset())
            .await
            .map_err(internal_error)?;
    Ok(Json(Page::new(rows, total, &params)))
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    tag = "Notifications",
    responses((status = 200, description = "Unread notifications", body = UnreadCount))
)]
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
) -> ApiResult<Json<UnreadCount>> {
    let pool = require_pg(&state)?;
    let unread = repo::notifications::unread_count(pool, user.id)
        .await
        .map_err(internal_error)?;
    Ok(Json(UnreadCount { unread }))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    tag = "Notifications",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked read", body = Notification),
        (status = 404, description = "Not found or not the caller's")
    )
)]
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Notification>> {
    let pool = require_pg(&state)?;
    let notification = repo::notifications::mark_read(pool, user.id, id, Utc::now())
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found(RESOURCE, id))?;
    Ok(Json(notification))
}

#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    tag = "Notifications",
    responses((status = 200, description = "Number marked read", body = MarkedRead))
)]
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
) -> ApiResult<Json<MarkedRead>> {
    let pool = require_pg(&state)?;
    let updated = repo::notifications::mark_all_read(pool, user.id, Utc::now())
        .await
        .map_err(internal_error)?;
    Ok(Json(MarkedRead { updated }))
}

#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    tag = "Notifications",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not the caller's")
    )
)]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let pool = require_pg(&state)?;
    if !repo::notifications::delete(pool, user.id, id)
        .await
        .map_err(internal_error)?
    {
        return Err(not_found(RESOURCE, id));
    }
    Ok(StatusCode::NO_CONTENT)
}
