//! Team CRUD and membership listing.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use bow_core::models::{CreateTeam, Team, UpdateTeam, User};
use bow_core::query::{ListParams, Page};
use bow_core::{authorize, Action, RecordScope, Resource, Scoped};

use crate::auth::AuthUser;
use crate::repo;
use crate::state::AppState;

use super::common::{db_error, denied, internal_error, not_found, require_pg, unprocessable, validate, ApiResult};

const RESOURCE: &str = "Team";

async fn load(state: &AppState, user: &User, id: Uuid, action: Action) -> ApiResult<Team> {
    let pool = require_pg(state)?;
    let team = repo::org::find_team(pool, id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found(RESOURCE, id))?;
    authorize(user, action, Resource::Team, &team.scope()).map_err(|d| denied(d, RESOURCE, Some(id)))?;
    Ok(team)
}

#[utoipa::path(
    get,
    path = "/api/teams",
    tag = "Teams",
    params(ListParams),
    responses((status = 200, description = "Teams of the caller's department", body = Page<Team>))
)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Page<Team>>> {
    let pool = require_pg(&state)?;
    let department = bow_core::department_filter(&user);
    let (rows, total) = repo::org::TEAM_LISTING
        .fetch_page::<Team>(pool, &params, department)
        .await
        .map_err(internal_error)?;
    Ok(Json(Page::new(rows, total, &params)))
}

#[utoipa::path(
    get,
    path = "/api/teams/{id}",
    tag = "Teams",
    params(("id" = Uuid, Path, description = "Team id")),
    responses(
        (status = 200, description = "The team", body = Team),
        (status = 404, description = "Not found")
    )
)]
pub async fn get(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Team>> {
    Ok(Json(load(&state, &user, id, Action::View).await?))
}

#[utoipa::path(
    get,
    path = "/api/teams/{id}/members",
    tag = "Teams",
    params(("id" = Uuid, Path, description = "Team id")),
    responses((status = 200, description = "Users in the team", body = Vec<User>))
)]
pub async fn members(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<User>>> {
    let team = load(&state, &user, id, Action::View).await?;
    let pool = require_pg(&state)?;
    let members = repo::users::team_members(pool, team.id).await.map_err(internal_error)?;
    Ok(Json(members))
}

#[utoipa::path(
    post,
    path = "/api/teams",
    tag = "Teams",
    request_body = CreateTeam,
    responses(
        (status = 201, description = "Created", body = Team),
        (status = 403, description = "Not allowed"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Json(input): Json<CreateTeam>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    let pool = require_pg(&state)?;
    let department_id = super::record_department(&user, input.department_id).ok_or_else(|| {
        unprocessable(bow_core::ValidationErrors::single(
            "department_id",
            "The department id field is required.",
        ))
    })?;
    authorize(&user, Action::Create, Resource::Team, &RecordScope::department(Some(department_id)))
        .map_err(|d| denied(d, RESOURCE, None))?;

    let team = Team::new(input, department_id, Utc::now());
    validate(&team)?;
    repo::org::insert_team(pool, &team).await.map_err(db_error)?;
    Ok((StatusCode::CREATED, Json(team)))
}

#[utoipa::path(
    put,
    path = "/api/teams/{id}",
    tag = "Teams",
    params(("id" = Uuid, Path, description = "Team id")),
    request_body = UpdateTeam,
    responses(
        (status = 200, description = "Updated", body = Team),
        (status = 404, description = "Not found"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateTeam>,
) -> ApiResult<Json<Team>> {
    let mut team = load(&state, &user, id, Action::Update).await?;
    let pool = require_pg(&state)?;

    team.apply(patch, Utc::now());
    // Moving a team needs rights in the destination department too.
    authorize(&user, Action::Update, Resource::Team, &team.scope()).map_err(|d| denied(d, RESOURCE, None))?;
    validate(&team)?;
    repo::org::update_team(pool, &team).await.map_err(db_error)?;
    Ok(Json(team))
}

#[utoipa::path(
    delete,
    path = "/api/teams/{id}",
    tag = "Teams",
    params(("id" = Uuid, Path, description = "Team id")),
    responses(
        (status = 204, description = "Deleted; members and work items are detached"),
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
    if !repo::org::delete_team(pool, id).await.map_err(db_error)? {
        return Err(not_found(RESOURCE, id));
    }
    Ok(StatusCode::NO_CONTENT)
}
