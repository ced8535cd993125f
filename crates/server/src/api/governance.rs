//! Governance items (policies, procedures, frameworks) and their reviews.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use bow_core::models::{CreateGovernanceItem, GovernanceItem, GovernanceItemView, UpdateGovernanceItem, User};
use bow_core::query::{ListParams, Page};
use bow_core::{authorize, department_filter, Action, RecordScope, Resource, Scoped};

use crate::auth::AuthUser;
use crate::repo;
use crate::state::AppState;

use super::common::{db_error, denied, internal_error, not_found, require_pg, validate, ApiResult};

const RESOURCE: &str = "Governance item";

async fn load(state: &AppState, user: &User, id: Uuid, action: Action) -> ApiResult<GovernanceItem> {
    let pool = require_pg(state)?;
    let item = repo::governance::find(pool, id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found(RESOURCE, id))?;
    authorize(user, action, Resource::GovernanceItem, &item.scope()).map_err(|d| denied(d, RESOURCE, Some(id)))?;
    Ok(item)
}

fn view(state: &AppState, item: GovernanceItem) -> GovernanceItemView {
    GovernanceItemView::new(item, state.today(), state.rag().amber_days)
}

#[utoipa::path(
    get,
    path = "/api/governance-items",
    tag = "Governance",
    params(ListParams),
    responses((status = 200, description = "Visible governance items", body = Page<GovernanceItemView>))
)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Page<GovernanceItemView>>> {
    let pool = require_pg(&state)?;
    let department = department_filter(&user);

    if let Some(rag) = params.rag {
        let rows = repo::governance::LISTING
            .fetch_all::<GovernanceItem>(pool, &params, department)
            .await
            .map_err(internal_error)?;
        let views = rows
            .into_iter()
            .map(|g| view(&state, g))
            .filter(|v| v.rag == rag)
            .collect();
        return Ok(Json(Page::from_vec(views, &params)));
    }

    let (rows, total) = repo::governance::LISTING
        .fetch_page::<GovernanceItem>(pool, &params, department)
        .await
        .map_err(internal_error)?;
    Ok(Json(Page::new(rows, total, &params).map(|g| view(&state, g))))
}

#[utoipa::path(
    get,
    path = "/api/governance-items/{id}",
    tag = "Governance",
    params(("id" = Uuid, Path, description = "Governance item id")),
    responses(
        (status = 200, description = "The governance item", body = GovernanceItemView),
        (status = 404, description = "Not found")
    )
)]
pub async fn get(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<GovernanceItemView>> {
    let item = load(&state, &user, id, Action::View).await?;
    Ok(Json(view(&state, item)))
}

#[utoipa::path(
    post,
    path = "/api/governance-items",
    tag = "Governance",
    request_body = CreateGovernanceItem,
    responses(
        (status = 201, description = "Created", body = GovernanceItemView),
        (status = 403, description = "Not allowed"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Json(input): Json<CreateGovernanceItem>,
) -> ApiResult<(StatusCode, Json<GovernanceItemView>)> {
    let pool = require_pg(&state)?;
    let department_id = super::record_department(&user, input.department_id);
    let scope = RecordScope {
        department_id,
        owner_id: input.owner_id.or(Some(user.id)),
        ..Default::default()
    };
    authorize(&user, Action::Create, Resource::GovernanceItem, &scope).map_err(|d| denied(d, RESOURCE, None))?;

    let item = GovernanceItem::new(input, user.id, department_id, Utc::now());
    validate(&item)?;
    repo::governance::insert(pool, &item).await.map_err(db_error)?;
    Ok((StatusCode::CREATED, Json(view(&state, item))))
}

#[utoipa::path(
    put,
    path = "/api/governance-items/{id}",
    tag = "Governance",
    params(("id" = Uuid, Path, description = "Governance item id")),
    request_body = UpdateGovernanceItem,
    responses(
        (status = 200, description = "Updated", body = GovernanceItemView),
        (status = 404, description = "Not found"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateGovernanceItem>,
) -> ApiResult<Json<GovernanceItemView>> {
    let mut item = load(&state, &user, id, Action::Update).await?;
    let pool = require_pg(&state)?;

    item.apply(patch, Utc::now());
    authorize(&user, Action::Update, Resource::GovernanceItem, &item.scope())
        .map_err(|d| denied(d, RESOURCE, None))?;
    validate(&item)?;
    repo::governance::update(pool, &item).await.map_err(db_error)?;
    Ok(Json(view(&state, item)))
}

#[utoipa::path(
    delete,
    path = "/api/governance-items/{id}",
    tag = "Governance",
    params(("id" = Uuid, Path, description = "Governance item id")),
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
    if !repo::governance::delete(pool, id).await.map_err(db_error)? {
        return Err(not_found(RESOURCE, id));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/governance-items/{id}/review",
    tag = "Governance",
    params(("id" = Uuid, Path, description = "Governance item id")),
    responses(
        (status = 200, description = "Reviewed today; next review scheduled", body = GovernanceItemView),
        (status = 404, description = "Not found")
    )
)]
pub async fn review(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<GovernanceItemView>> {
    let mut item = load(&state, &user, id, Action::Update).await?;
    let pool = require_pg(&state)?;

    item.mark_reviewed(state.today(), Utc::now());
    repo::governance::update(pool, &item).await.map_err(db_error)?;
    info!(governance_item_id = %id, user_id = %user.id, next_review = ?item.next_review_date, "governance item reviewed");
    Ok(Json(view(&state, item)))
}
