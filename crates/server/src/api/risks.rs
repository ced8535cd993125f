//! Risk register endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use bow_core::models::{CreateRisk, Risk, RiskView, UpdateRisk, User};
use bow_core::query::{ListParams, Page};
use bow_core::{authorize, department_filter, Action, RecordScope, Resource, Scoped};

use crate::auth::AuthUser;
use crate::repo;
use crate::state::AppState;

use super::common::{db_error, denied, internal_error, not_found, require_pg, validate, ApiResult};

const RESOURCE: &str = "Risk";

async fn load(state: &AppState, user: &User, id: Uuid, action: Action) -> ApiResult<Risk> {
    let pool = require_pg(state)?;
    let risk = repo::risks::find(pool, id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found(RESOURCE, id))?;
    authorize(user, action, Resource::Risk, &risk.scope()).map_err(|d| denied(d, RESOURCE, Some(id)))?;
    Ok(risk)
}

#[utoipa::path(
    get,
    path = "/api/risks",
    tag = "Risks",
    params(ListParams),
    responses((status = 200, description = "Visible risks with score and RAG", body = Page<RiskView>))
)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Page<RiskView>>> {
    let pool = require_pg(&state)?;
    let department = department_filter(&user);

    if let Some(rag) = params.rag {
        let rows = repo::risks::LISTING
            .fetch_all::<Risk>(pool, &params, department)
            .await
            .map_err(internal_error)?;
        let views = rows.into_iter().map(RiskView::from).filter(|v| v.rag == rag).collect();
        return Ok(Json(Page::from_vec(views, &params)));
    }

    let (rows, total) = repo::risks::LISTING
        .fetch_page::<Risk>(pool, &params, department)
        .await
        .map_err(internal_error)?;
    Ok(Json(Page::new(rows, total, &params).map(RiskView::from)))
}

#[utoipa::path(
    get,
    path = "/api/risks/{id}",
    tag = "Risks",
    params(("id" = Uuid, Path, description = "Risk id")),
    responses(
        (status = 200, description = "The risk", body = RiskView),
        (status = 404, description = "Not found")
    )
)]
pub async fn get(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RiskView>> {
    let risk = load(&state, &user, id, Action::View).await?;
    Ok(Json(RiskView::from(risk)))
}

#[utoipa::path(
    post,
    path = "/api/risks",
    tag = "Risks",
    request_body = CreateRisk,
    responses(
        (status = 201, description = "Created", body = RiskView),
        (status = 403, description = "Not allowed"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Json(input): Json<CreateRisk>,
) -> ApiResult<(StatusCode, Json<RiskView>)> {
    let pool = require_pg(&state)?;
    let department_id = super::record_department(&user, input.department_id);
    let scope = RecordScope {
        department_id,
        owner_id: input.owner_id.or(Some(user.id)),
        ..Default::default()
    };
    authorize(&user, Action::Create, Resource::Risk, &scope).map_err(|d| denied(d, RESOURCE, None))?;

    let risk = Risk::new(input, user.id, department_id, Utc::now());
    validate(&risk)?;
    repo::risks::insert(pool, &risk).await.map_err(db_error)?;
    Ok((StatusCode::CREATED, Json(RiskView::from(risk))))
}

#[utoipa::path(
    put,
    path = "/api/risks/{id}",
    tag = "Risks",
    params(("id" = Uuid, Path, description = "Risk id")),
    request_body = UpdateRisk,
    responses(
        (status = 200, description = "Updated", body = RiskView),
        (status = 404, description = "Not found"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateRisk>,
) -> ApiResult<Json<RiskView>> {
    let mut risk = load(&state, &user, id, Action::Update).await?;
    let pool = require_pg(&state)?;

    risk.apply(patch, Utc::now());
    authorize(&user, Action::Update, Resource::Risk, &risk.scope()).map_err(|d| denied(d, RESOURCE, None))?;
    validate(&risk)?;
    repo::risks::update(pool, &risk).await.map_err(db_error)?;
    Ok(Json(RiskView::from(risk)))
}

#[utoipa::path(
    delete,
    path = "/api/risks/{id}",
    tag = "Risks",
    params(("id" = Uuid, Path, description = "Risk id")),
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
    if !repo::risks::delete(pool, id).await.map_err(db_error)? {
        return Err(not_found(RESOURCE, id));
    }
    Ok(StatusCode::NO_CONTENT)
}
