//! User accounts. Only admins create, change or delete accounts; managers
//! can browse their department and everyone else sees themselves.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use bow_core::models::{CreateUser, Role, UpdateUser, User};
use bow_core::query::{ListParams, Page};
use bow_core::validation::{self, ValidationErrors};
use bow_core::{authorize, Action, RecordScope, Resource, Scoped, Validate};

use crate::auth::{hash_password, AuthUser};
use crate::repo;
use crate::state::AppState;

use super::common::{
    db_error, denied, forbidden, internal_error, not_found, require_pg, unprocessable, validate, ApiResult,
};

const RESOURCE: &str = "User";

/// Side writes of an account update, hashed up front so the database
/// transaction has nothing left that can fail halfway.
struct UserWrite {
    password_hash: Option<String>,
    /// Deactivation and password resets end every session.
    revoke_sessions: bool,
}

impl UserWrite {
    fn plan(updated: &User, patch: &UpdateUser) -> anyhow::Result<Self> {
        let password_hash = patch.password.as_deref().map(hash_password).transpose()?;
        Ok(Self {
            revoke_sessions: !updated.is_active || password_hash.is_some(),
            password_hash,
        })
    }
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    params(ListParams),
    responses((status = 200, description = "Visible users", body = Page<User>))
)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Page<User>>> {
    let pool = require_pg(&state)?;
    let department = match user.role {
        Role::Admin => None,
        Role::Manager => bow_core::department_filter(&user),
        Role::Member | Role::Viewer => return Ok(Json(Page::from_vec(vec![user], &params))),
    };
    let (rows, total) = repo::users::LISTING
        .fetch_page::<User>(pool, &params, department)
        .await
        .map_err(internal_error)?;
    Ok(Json(Page::new(rows, total, &params)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = User),
        (status = 404, description = "Not found")
    )
)]
pub async fn get(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    let pool = require_pg(&state)?;
    let target = repo::users::find(pool, id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found(RESOURCE, id))?;
    authorize(&user, Action::View, Resource::User, &target.scope()).map_err(|d| denied(d, RESOURCE, Some(id)))?;
    Ok(Json(target))
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 403, description = "Admins only"),
        (status = 409, description = "E-mail already registered"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Json(input): Json<CreateUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let pool = require_pg(&state)?;
    authorize(&user, Action::Create, Resource::User, &RecordScope::default())
        .map_err(|d| denied(d, RESOURCE, None))?;
    validate(&input)?;

    let created = User::new(&input, Utc::now());
    let hash = hash_password(&input.password).map_err(internal_error)?;
    repo::users::insert(pool, &created, &hash).await.map_err(db_error)?;

    info!(user_id = %created.id, role = %created.role, by = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 404, description = "Not found"),
        (status = 409, description = "E-mail already registered"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateUser>,
) -> ApiResult<Json<User>> {
    let pool = require_pg(&state)?;
    let mut target = repo::users::find(pool, id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found(RESOURCE, id))?;
    authorize(&user, Action::Update, Resource::User, &target.scope()).map_err(|d| denied(d, RESOURCE, Some(id)))?;

    target.apply(&patch, Utc::now());
    let mut errors = target.validate().err().unwrap_or_else(ValidationErrors::new);
    if let Some(password) = &patch.password {
        validation::password(&mut errors, "password", password);
    }
    if target.id == user.id && (target.role != Role::Admin || !target.is_active) {
        errors.add("role", "You cannot remove your own admin access.");
    }
    errors.into_result().map_err(unprocessable)?;

    let write = UserWrite::plan(&target, &patch).map_err(internal_error)?;
    repo::users::save(pool, &target, write.password_hash.as_deref(), write.revoke_sessions)
        .await
        .map_err(db_error)?;

    info!(user_id = %target.id, by = %user.id, "user updated");
    Ok(Json(target))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "Deleted; owned and assigned records are detached"),
        (status = 403, description = "Admins only, and not on themselves"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let pool = require_pg(&state)?;
    let target = repo::users::find(pool, id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| not_found(RESOURCE, id))?;
    authorize(&user, Action::Delete, Resource::User, &target.scope()).map_err(|d| denied(d, RESOURCE, Some(id)))?;
    if target.id == user.id {
        return Err(forbidden("You cannot delete your own account."));
    }

    if !repo::users::delete(pool, id).await.map_err(db_error)? {
        return Err(not_found(RESOURCE, id));
    }
    info!(user_id = %id, by = %user.id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;

    fn member() -> User {
        User::new(
            &CreateUser {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                password: "correct-horse".into(),
                role: Role::Member,
                department_id: None,
                team_id: None,
                email_notifications: true,
            },
            Utc::now(),
        )
    }

    #[test]
    fn profile_change_keeps_sessions() {
        let patch = UpdateUser { name: Some("Ada L.".into()), ..Default::default() };
        let write = UserWrite::plan(&member(), &patch).unwrap();
        assert!(write.password_hash.is_none());
        assert!(!write.revoke_sessions);
    }

    #[test]
    fn password_reset_is_hashed_before_saving_and_ends_sessions() {
        let patch = UpdateUser { password: Some("new-secret-42".into()), ..Default::default() };
        let write = UserWrite::plan(&member(), &patch).unwrap();
        let hash = write.password_hash.unwrap();
        assert!(verify_password("new-secret-42", &hash));
        assert!(write.revoke_sessions);
    }

    #[test]
    fn deactivation_ends_sessions() {
        let mut user = member();
        user.is_active = false;
        let write = UserWrite::plan(&user, &UpdateUser::default()).unwrap();
        assert!(write.revoke_sessions);
    }
}
