//! Department CRUD. Managing departments is admin-only; everyone else sees
//! their own department.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use bow_core::models::{CreateDepartment, Department, UpdateDepartment};
use bow_core::{authorize, Action, RecordScope, Resource};

use crate::auth::AuthUser;
use crate::repo;
use crate::state::AppState;

use super::common::{conflict, db_error, denied, internal_error, not_found, require_pg, validate, ApiResult};

const RESOURCE: &str = "Department";

fn scope(id: Uuid) -> RecordScope {
    RecordScope::department(Some(id))
}

#[utoipa::path(
    get,
    path = "/api/departments",
    tag = "Departments",
    responses((status = 200, description = "Visible departments", body = Vec<Department>))
)]
pub async fn list(State(state): State<Arc<AppState>>, AuthUser { user, .. }: AuthUser) -> ApiResult<Json<Vec<Department>>> {
    let pool = require_pg(&state)?;
    let only = if user.is_admin() {
        None
    } else {
        // Nil matches nothing for users without a department.
        Some(user.department_id.unwrap_or(Uuid::nil()))
    };
    let rows = repo::org::list_departments(pool, only).await.map_err(internal_error)?;
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/api/departments/{id}",
    tag = "Departments",
    params(("id" = Uuid, Path, description = "Department id")),
    responses(
        (status = 200, description = "The department", body = Department),
        (status = 404, description = "Not found")
    )
)]
pub async fn get(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Department>> {
    let pool = require_pg(&state)?;
    authorize(&user, Action::View, Resource::Department, &scope(id)).map_err(|_| not_found(RESOURCE, id))?;
    let department = repo::org::find_department(pool, id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found(RESOURCE, id))?;
    Ok(Json(department))
}

#[utoipa::path(
    post,
    path = "/api/departments",
    tag = "Departments",
    request_body = CreateDepartment,
    responses(
        (status = 201, description = "Created", body = Department),
        (status = 409, description = "Name already taken"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Json(input): Json<CreateDepartment>,
) -> ApiResult<(StatusCode, Json<Department>)> {
    let pool = require_pg(&state)?;
    authorize(&user, Action::Create, Resource::Department, &RecordScope::default())
        .map_err(|d| denied(d, RESOURCE, None))?;

    let department = Department::new(input, Utc::now());
    validate(&department)?;
    repo::org::insert_department(pool, &department).await.map_err(db_error)?;
    Ok((StatusCode::CREATED, Json(department)))
}

#[utoipa::path(
    put,
    path = "/api/departments/{id}",
    tag = "Departments",
    params(("id" = Uuid, Path, description = "Department id")),
    request_body = UpdateDepartment,
    responses(
        (status = 200, description = "Updated", body = Department),
        (status = 404, description = "Not found"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateDepartment>,
) -> ApiResult<Json<Department>> {
    let pool = require_pg(&state)?;
    authorize(&user, Action::Update, Resource::Department, &scope(id)).map_err(|d| denied(d, RESOURCE, Some(id)))?;

    let mut department = repo::org::find_department(pool, id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found(RESOURCE, id))?;
    department.apply(patch, Utc::now());
    validate(&department)?;
    repo::org::update_department(pool, &department).await.map_err(db_error)?;
    Ok(Json(department))
}

#[utoipa::path(
    delete,
    path = "/api/departments/{id}",
    tag = "Departments",
    params(("id" = Uuid, Path, description = "Department id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Teams or users still belong to it")
    )
)]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let pool = require_pg(&state)?;
    authorize(&user, Action::Delete, Resource::Department, &scope(id)).map_err(|d| denied(d, RESOURCE, Some(id)))?;

    let (teams, users) = repo::org::department_dependents(pool, id).await.map_err(internal_error)?;
    if teams > 0 || users > 0 {
        return Err(conflict(format!(
            "The department still has {teams} team(s) and {users} user(s). Move or delete them first."
        )));
    }
    if !repo::org::delete_department(pool, id).await.map_err(db_error)? {
        return Err(not_found(RESOURCE, id));
    }
    Ok(StatusCode::NO_CONTENT)
}
