//! Work items, the kanban board and card moves.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use bow_core::kanban::{self, Board, MoveCard};
use bow_core::models::{CreateWorkItem, UpdateWorkItem, User, WorkItem, WorkItemView};
use bow_core::query::{ListParams, Page};
use bow_core::{authorize, department_filter, Action, RecordScope, Resource, Scoped};

use crate::auth::AuthUser;
use crate::messaging;
use crate::repo;
use crate::state::AppState;

use super::common::{
    db_error, denied, domain_error, internal_error, not_found, require_pg, validate, ApiResult,
};

const RESOURCE: &str = "Work item";

async fn load(state: &AppState, user: &User, id: Uuid, action: Action) -> ApiResult<WorkItem> {
    let pool = require_pg(state)?;
    let item = repo::work_items::find(pool, id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found(RESOURCE, id))?;
    authorize(user, action, Resource::WorkItem, &item.scope()).map_err(|d| denied(d, RESOURCE, Some(id)))?;
    Ok(item)
}

fn view(state: &AppState, item: WorkItem) -> WorkItemView {
    WorkItemView::new(item, state.today(), state.rag().amber_days)
}

#[utoipa::path(
    get,
    path = "/api/work-items",
    tag = "Work items",
    params(ListParams),
    responses((status = 200, description = "Visible work items", body = Page<WorkItemView>))
)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Page<WorkItemView>>> {
    let pool = require_pg(&state)?;
    let department = department_filter(&user);

    // RAG is computed, so that filter runs after loading.
    if let Some(rag) = params.rag {
        let rows = repo::work_items::LISTING
            .fetch_all::<WorkItem>(pool, &params, department)
            .await
            .map_err(internal_error)?;
        let views = rows
            .into_iter()
            .map(|w| view(&state, w))
            .filter(|v| v.rag == rag)
            .collect();
        return Ok(Json(Page::from_vec(views, &params)));
    }

    let (rows, total) = repo::work_items::LISTING
        .fetch_page::<WorkItem>(pool, &params, department)
        .await
        .map_err(internal_error)?;
    Ok(Json(Page::new(rows, total, &params).map(|w| view(&state, w))))
}

#[utoipa::path(
    get,
    path = "/api/work-items/{id}",
    tag = "Work items",
    params(("id" = Uuid, Path, description = "Work item id")),
    responses(
        (status = 200, description = "The work item", body = WorkItemView),
        (status = 404, description = "Not found")
    )
)]
pub async fn get(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WorkItemView>> {
    let item = load(&state, &user, id, Action::View).await?;
    Ok(Json(view(&state, item)))
}

#[utoipa::path(
    post,
    path = "/api/work-items",
    tag = "Work items",
    request_body = CreateWorkItem,
    responses(
        (status = 201, description = "Created; the assignee is notified", body = WorkItemView),
        (status = 403, description = "Not allowed"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Json(input): Json<CreateWorkItem>,
) -> ApiResult<(StatusCode, Json<WorkItemView>)> {
    let pool = require_pg(&state)?;
    let department_id = super::record_department(&user, input.department_id);
    let scope = RecordScope {
        department_id,
        owner_id: Some(user.id),
        assignee_id: input.assignee_id,
        team_id: input.team_id,
    };
    authorize(&user, Action::Create, Resource::WorkItem, &scope).map_err(|d| denied(d, RESOURCE, None))?;

    let position = repo::work_items::next_position(pool, input.status, department_filter(&user))
        .await
        .map_err(internal_error)?;
    let item = WorkItem::new(input, user.id, department_id, position, Utc::now());
    validate(&item)?;
    repo::work_items::insert(pool, &item).await.map_err(db_error)?;

    info!(work_item_id = %item.id, user_id = %user.id, "work item created");
    messaging::notify_assignment(&state, pool, &item, &user).await;
    Ok((StatusCode::CREATED, Json(view(&state, item))))
}

#[utoipa::path(
    put,
    path = "/api/work-items/{id}",
    tag = "Work items",
    params(("id" = Uuid, Path, description = "Work item id")),
    request_body = UpdateWorkItem,
    responses(
        (status = 200, description = "Updated; a new assignee is notified", body = WorkItemView),
        (status = 404, description = "Not found"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateWorkItem>,
) -> ApiResult<Json<WorkItemView>> {
    let mut item = load(&state, &user, id, Action::Update).await?;
    let pool = require_pg(&state)?;
    let previous_assignee = item.assignee_id;
    let previous_status = item.status;

    item.apply(patch, Utc::now());
    // The changed record must still be one the caller may edit.
    authorize(&user, Action::Update, Resource::WorkItem, &item.scope()).map_err(|d| denied(d, RESOURCE, None))?;
    if item.status != previous_status {
        item.position = repo::work_items::next_position(pool, item.status, department_filter(&user))
            .await
            .map_err(internal_error)?;
    }
    validate(&item)?;
    repo::work_items::update(pool, &item).await.map_err(db_error)?;

    if item.assignee_id != previous_assignee {
        messaging::notify_assignment(&state, pool, &item, &user).await;
    }
    Ok(Json(view(&state, item)))
}

#[utoipa::path(
    delete,
    path = "/api/work-items/{id}",
    tag = "Work items",
    params(("id" = Uuid, Path, description = "Work item id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    load(&state, &user, id, Action::Delete).await?;
    let pool = require_pg(&state)?;
    if !repo::work_items::delete(pool, id).await.map_err(db_error)? {
        return Err(not_found(RESOURCE, id));
    }
    info!(work_item_id = %id, user_id = %user.id, "work item deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/work-items/board",
    tag = "Work items",
    params(ListParams),
    responses((status = 200, description = "Kanban columns in workflow order", body = Board))
)]
pub async fn board(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Board>> {
    let pool = require_pg(&state)?;
    let items = repo::work_items::LISTING
        .fetch_all::<WorkItem>(pool, &params, department_filter(&user))
        .await
        .map_err(internal_error)?;
    Ok(Json(kanban::board(items, state.today(), state.rag().amber_days)))
}

#[utoipa::path(
    post,
    path = "/api/work-items/{id}/move",
    tag = "Work items",
    params(("id" = Uuid, Path, description = "Work item id")),
    request_body = MoveCard,
    responses(
        (status = 200, description = "The moved card", body = WorkItemView),
        (status = 404, description = "Not found")
    )
)]
pub async fn move_card(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<MoveCard>,
) -> ApiResult<Json<WorkItemView>> {
    let item = load(&state, &user, id, Action::Update).await?;
    let pool = require_pg(&state)?;

    let mut statuses = vec![item.status];
    if req.status != item.status {
        statuses.push(req.status);
    }
    let department = department_filter(&user);
    let cards = repo::work_items::in_columns(pool, &statuses, department)
        .await
        .map_err(internal_error)?;
    let now = Utc::now();
    let updates =
        kanban::move_card(&cards, department, id, req.status, req.position, now).map_err(domain_error)?;
    repo::work_items::apply_moves(pool, &updates, now)
        .await
        .map_err(internal_error)?;

    let moved = repo::work_items::find(pool, id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found(RESOURCE, id))?;
    Ok(Json(view(&state, moved)))
}
