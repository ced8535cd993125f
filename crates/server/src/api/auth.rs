//! Login, logout, the current user and password changes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use bow_core::models::{normalize_email, User};
use bow_core::validation::{self, ValidationErrors};

use crate::auth::{generate_token, hash_password, token_hash, verify_password, AuthUser};
use crate::repo;
use crate::state::AppState;

use super::common::{internal_error, require_pg, unauthorized, unprocessable, ApiResult};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Shown once; only its digest is stored.
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePassword {
    pub current_password: String,
    pub password: String,
    pub password_confirmation: String,
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Bad credentials or inactive account"),
        (status = 422, description = "Missing fields")
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let mut errors = ValidationErrors::new();
    validation::required(&mut errors, "email", &req.email);
    validation::required(&mut errors, "password", &req.password);
    errors.into_result().map_err(unprocessable)?;

    let pool = require_pg(&state)?;
    let (user, _) = repo::users::find_credentials(pool, &normalize_email(&req.email))
        .await
        .map_err(internal_error)?
        .filter(|(_, hash)| verify_password(&req.password, hash))
        .ok_or_else(|| unauthorized("These credentials do not match our records."))?;

    if !user.is_active {
        return Err(unauthorized("This account has been deactivated."));
    }

    let now = Utc::now();
    let token = generate_token();
    let expires_at = now + Duration::hours(i64::from(state.config.auth.token_ttl_hours));
    repo::users::insert_token(pool, &token_hash(&token), user.id, expires_at)
        .await
        .map_err(internal_error)?;
    repo::users::touch_login(pool, user.id, now).await.map_err(internal_error)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_at,
        user: User {
            last_login_at: Some(now),
            ..user
        },
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses((status = 204, description = "Token revoked"))
)]
pub async fn logout(State(state): State<Arc<AppState>>, auth: AuthUser) -> ApiResult<StatusCode> {
    let pool = require_pg(&state)?;
    repo::users::delete_token(pool, &auth.token_hash)
        .await
        .map_err(internal_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "The authenticated user", body = User),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn me(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}

#[utoipa::path(
    put,
    path = "/api/auth/password",
    tag = "Auth",
    request_body = ChangePassword,
    responses(
        (status = 204, description = "Password changed; other sessions revoked"),
        (status = 422, description = "Wrong current password or weak new password")
    )
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<ChangePassword>,
) -> ApiResult<StatusCode> {
    let pool = require_pg(&state)?;
    let current = repo::users::password_hash(pool, auth.user.id)
        .await
        .map_err(internal_error)?
        .unwrap_or_default();

    let mut errors = ValidationErrors::new();
    if !verify_password(&req.current_password, &current) {
        errors.add("current_password", "The current password is incorrect.");
    }
    validation::password(&mut errors, "password", &req.password);
    if req.password != req.password_confirmation {
        errors.add("password", "The password confirmation does not match.");
    }
    errors.into_result().map_err(unprocessable)?;

    let hash = hash_password(&req.password).map_err(internal_error)?;
    repo::users::set_password(pool, auth.user.id, &hash, Utc::now())
        .await
        .map_err(internal_error)?;
    repo::users::delete_tokens_except(pool, auth.user.id, Some(&auth.token_hash))
        .await
        .map_err(internal_error)?;

    info!(user_id = %auth.user.id, "password changed");
    Ok(StatusCode::NO_CONTENT)
}
