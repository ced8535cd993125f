//! Password hashing, API tokens and the authenticated-user extractor.
//!
//! A login issues a random 32-byte token, returned to the client once and
//! stored only as its SHA-256 hex digest.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use sha2::{Digest, Sha256};

use bow_core::models::User;

use crate::api::common::{internal_error, require_pg, unauthorized, ApiError};
use crate::repo;
use crate::state::AppState;

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("hashing password: {e}"))?;
    Ok(hash.to_string())
}

pub fn verify_password(plain: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(plain.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

/// A fresh bearer token, hex encoded.
pub fn generate_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

pub fn token_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// The bearer token of a request, if any.
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// The active user behind the request's bearer token.
pub struct AuthUser {
    pub user: User,
    /// Digest of the token used, so logout can revoke exactly this session.
    pub token_hash: String,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| unauthorized("Unauthenticated."))?;
        let pool = require_pg(state)?;
        let digest = token_hash(token);

        let user = repo::users::user_for_token(pool, &digest, Utc::now())
            .await
            .map_err(internal_error)?
            .ok_or_else(|| unauthorized("Unauthenticated."))?;
        if !user.is_active {
            return Err(unauthorized("This account has been deactivated."));
        }

        tracing::debug!(user_id = %user.id, "authenticated request");
        Ok(Self { user, token_hash: digest })
    }
}
